//! Persistence: the external document-store interface and the typed
//! interview facade over it.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use crate::interview::{Insights, Interview, InterviewStatus, Turn, now_iso};

// The document store is an external collaborator: a key-value service
// addressed by interview id, supporting point lookups, atomic field-set (keys
// are dotted paths into the document) and atomic array-append. Everything the
// orchestrator persists goes through this seam.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, id: &str, doc: Value) -> Result<()>;

    async fn find(&self, id: &str) -> Result<Option<Value>>;

    /// Set fields atomically. Keys are dotted paths relative to the document
    /// root; numeric segments index into arrays.
    async fn set(&self, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Append a value to the array at `field`, creating it if missing.
    async fn push(&self, id: &str, field: &str, value: Value) -> Result<()>;
}

/// In-process document store. The shipped default and the test double; a
/// deployment that needs durability swaps in another `DocumentStore` impl.
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk a dotted path inside a document, creating intermediate objects where
/// the path does not exist yet. Array segments must parse as indices into an
/// existing element.
fn resolve_path<'a>(mut current: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment).or_insert(Value::Null),
            Value::Array(arr) => arr.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, id: &str, doc: Value) -> Result<()> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(id) {
            bail!("Document already exists: {id}");
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn set(&self, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .with_context(|| format!("No such document: {id}"))?;
        for (path, value) in fields {
            let slot = resolve_path(doc, &path)
                .with_context(|| format!("Unresolvable path {path:?} in {id}"))?;
            *slot = value;
        }
        Ok(())
    }

    async fn push(&self, id: &str, field: &str, value: Value) -> Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .with_context(|| format!("No such document: {id}"))?;
        let slot = resolve_path(doc, field)
            .with_context(|| format!("Unresolvable path {field:?} in {id}"))?;
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(arr) => {
                arr.push(value);
                Ok(())
            }
            _ => bail!("Field {field:?} in {id} is not an array"),
        }
    }
}

/// Typed facade over the document store: the append-only interview history
/// plus its mutable scalar fields. One writer per interview is assumed (the
/// session orchestrator serializes turns), so read-modify cycles here never
/// race with themselves.
#[derive(Clone)]
pub struct InterviewStore {
    inner: Arc<dyn DocumentStore>,
}

impl InterviewStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }

    pub async fn create(&self, interview: &Interview) -> Result<()> {
        let doc = serde_json::to_value(interview).context("Failed to serialize interview")?;
        self.inner.insert(&interview.interview_id, doc).await
    }

    pub async fn load(&self, id: &str) -> Result<Option<Interview>> {
        match self.inner.find(id).await? {
            Some(doc) => {
                let interview =
                    serde_json::from_value(doc).context("Malformed interview document")?;
                Ok(Some(interview))
            }
            None => Ok(None),
        }
    }

    pub async fn append_turn(&self, id: &str, turn: &Turn) -> Result<()> {
        let value = serde_json::to_value(turn).context("Failed to serialize turn")?;
        self.inner.push(id, "history", value).await
    }

    /// Persist the rating for an accepted user turn and advance the question
    /// index, as one field-set call: the rating lands on the turn already in
    /// the history (at `turn_position`), in the ratings map, and the index
    /// increments by exactly one.
    pub async fn complete_user_turn(
        &self,
        id: &str,
        question_index: usize,
        turn_position: usize,
        rating: f64,
    ) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(
            format!("ratings.{}", Interview::rating_key(question_index)),
            json!(rating),
        );
        fields.insert(format!("history.{turn_position}.rating"), json!(rating));
        fields.insert("question_index".to_string(), json!(question_index + 1));
        fields.insert(
            "candidate_details.last_question_answered".to_string(),
            json!(question_index),
        );
        fields.insert("candidate_details.last_update".to_string(), json!(now_iso()));
        self.inner.set(id, fields).await
    }

    pub async fn set_status(&self, id: &str, status: InterviewStatus) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        self.inner.set(id, fields).await
    }

    /// Terminal bookkeeping when the closing turn goes out.
    pub async fn mark_completed(&self, id: &str) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(
            "status".to_string(),
            serde_json::to_value(InterviewStatus::Completed)?,
        );
        fields.insert(
            "candidate_details.completion_date".to_string(),
            json!(now_iso()),
        );
        self.inner.set(id, fields).await
    }

    /// Persist the narrative summary with its final status, and the computed
    /// insights when compilation succeeded.
    pub async fn store_summary(
        &self,
        id: &str,
        summary: &str,
        status: InterviewStatus,
        insights: Option<&Insights>,
    ) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("summary".to_string(), json!(summary));
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        if let Some(insights) = insights {
            fields.insert(
                "candidate_details.insights".to_string(),
                serde_json::to_value(insights)?,
            );
        }
        self.inner.set(id, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::Role;

    fn store() -> InterviewStore {
        InterviewStore::new(Arc::new(MemoryStore::new()))
    }

    fn sample_interview(id: &str) -> Interview {
        Interview::new(id, vec!["A?".into(), "B?".into()], "job", "resume")
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let store = store();
        store.create(&sample_interview("int_a")).await.unwrap();

        let loaded = store.load("int_a").await.unwrap().unwrap();
        assert_eq!(loaded.questions, vec!["A?", "B?"]);
        assert_eq!(loaded.question_index, 0);
        assert_eq!(loaded.status, InterviewStatus::Pending);
    }

    #[tokio::test]
    async fn load_missing_is_none_and_duplicate_insert_fails() {
        let store = store();
        assert!(store.load("nope").await.unwrap().is_none());

        store.create(&sample_interview("int_b")).await.unwrap();
        assert!(store.create(&sample_interview("int_b")).await.is_err());
    }

    #[tokio::test]
    async fn turns_append_in_order() {
        let store = store();
        store.create(&sample_interview("int_c")).await.unwrap();

        store
            .append_turn("int_c", &Turn::assistant("A?"))
            .await
            .unwrap();
        store
            .append_turn("int_c", &Turn::user("my answer"))
            .await
            .unwrap();

        let loaded = store.load("int_c").await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.history[0].role, Role::Assistant);
        assert_eq!(loaded.history[1].content, "my answer");
    }

    #[tokio::test]
    async fn completing_a_turn_annotates_rating_and_advances_index() {
        let store = store();
        store.create(&sample_interview("int_d")).await.unwrap();
        store
            .append_turn("int_d", &Turn::assistant("A?"))
            .await
            .unwrap();
        store
            .append_turn("int_d", &Turn::user("answer"))
            .await
            .unwrap();

        store.complete_user_turn("int_d", 0, 1, 7.0).await.unwrap();

        let loaded = store.load("int_d").await.unwrap().unwrap();
        assert_eq!(loaded.question_index, 1);
        assert_eq!(loaded.history[1].rating, Some(7.0));
        assert_eq!(loaded.ratings.get("q0"), Some(&7.0));
        assert_eq!(loaded.candidate_details.last_question_answered, Some(0));
    }

    #[tokio::test]
    async fn summary_storage_keeps_status_and_insights() {
        let store = store();
        store.create(&sample_interview("int_e")).await.unwrap();

        let insights = Insights {
            average_rating: 6.5,
            questions_answered: 2,
            total_questions: 2,
            ..Insights::default()
        };
        store
            .store_summary("int_e", "solid", InterviewStatus::Completed, Some(&insights))
            .await
            .unwrap();

        let loaded = store.load("int_e").await.unwrap().unwrap();
        assert_eq!(loaded.summary.as_deref(), Some("solid"));
        assert_eq!(loaded.status, InterviewStatus::Completed);
        assert_eq!(
            loaded.candidate_details.insights.unwrap().average_rating,
            6.5
        );
    }

    #[tokio::test]
    async fn set_on_a_missing_document_fails() {
        let raw = MemoryStore::new();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("completed"));
        assert!(raw.set("ghost", fields).await.is_err());
        assert!(raw.push("ghost", "history", json!({})).await.is_err());
    }

    #[test]
    fn dotted_paths_walk_objects_and_arrays() {
        let mut doc = json!({
            "history": [ {"role": "user", "content": "hi"} ],
            "meta": {}
        });

        *resolve_path(&mut doc, "history.0.rating").unwrap() = json!(9.0);
        *resolve_path(&mut doc, "meta.nested.flag").unwrap() = json!(true);

        assert_eq!(doc["history"][0]["rating"], json!(9.0));
        assert_eq!(doc["meta"]["nested"]["flag"], json!(true));
        assert!(resolve_path(&mut doc, "history.5.rating").is_none());
        assert!(resolve_path(&mut doc, "history.notanindex").is_none());
    }
}
