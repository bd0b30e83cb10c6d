pub mod create;
pub mod insights;
pub mod interview;
pub mod oracle;
pub mod parser;
pub mod prompts;
pub mod question;
pub mod rating;
pub mod resume;
pub mod session;
pub mod speech;
pub mod store;
pub mod transition;

pub use create::{CreatedInterview, create_interview};
pub use insights::{InsightsCompiler, InsightsReport};
pub use interview::{Interview, InterviewStatus, Role, Turn};
pub use session::{InterviewSession, OutboundMessage, SessionError, SessionState};
