// ============================
// taskchat-backend-lib/src/store.rs
// ============================
//! Record store abstraction with flat-file implementation.
//!
//! Records are schemaless JSON documents grouped by kind. `insert` assigns
//! the durable `_id` and `createdAt`; the returned value is the stored form
//! and is what downstream consumers (fan-out, HTTP handlers) hand out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io::ErrorKind};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

use crate::error::AppError;

/// The four durable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Todo,
    Conversation,
    Message,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Todo => "todo",
            RecordKind::Conversation => "conversation",
            RecordKind::Message => "message",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            RecordKind::User => "users.jsonl",
            RecordKind::Todo => "todos.jsonl",
            RecordKind::Conversation => "conversations.jsonl",
            RecordKind::Message => "messages.jsonl",
        }
    }
}

/// Trait for record store backends
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record, assigning `_id` and `createdAt`. Returns the stored form.
    async fn insert(&self, kind: RecordKind, fields: Value) -> Result<Value, AppError>;

    /// Read records of a kind, in insertion order. A filter is a flat object
    /// whose key/value pairs must all match.
    async fn find(&self, kind: RecordKind, filter: Option<&Value>) -> Result<Vec<Value>, AppError>;

    /// Merge `fields` into the record with the given id. Returns the updated
    /// record, or `None` if no such id exists.
    async fn update_by_id(
        &self,
        kind: RecordKind,
        id: &str,
        fields: Value,
    ) -> Result<Option<Value>, AppError>;

    /// Delete the record with the given id. Deleting an unknown id is a no-op.
    async fn delete_by_id(&self, kind: RecordKind, id: &str) -> Result<(), AppError>;
}

/// Flat-file implementation of the `RecordStore` trait: one JSON-lines file
/// per record kind under a data root.
#[derive(Clone)]
pub struct FlatFileStore {
    root: PathBuf,
    // one writer at a time; read-modify-rewrite must not interleave
    lock: Arc<Mutex<()>>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn path_for(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    async fn read_all(&self, kind: RecordKind) -> Result<Vec<Value>, AppError> {
        let path = self.path_for(kind);
        let content = match tokio_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    async fn write_all(&self, kind: RecordKind, records: &[Value]) -> Result<(), AppError> {
        let mut out = String::new();
        for record in records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        tokio_fs::write(self.path_for(kind), out).await?;
        Ok(())
    }
}

fn as_object(fields: Value) -> Result<Map<String, Value>, AppError> {
    match fields {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Storage(format!(
            "record fields must be a JSON object, got {other}"
        ))),
    }
}

fn matches_filter(record: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(map) => map.iter().all(|(k, v)| record.get(k) == Some(v)),
        None => false,
    }
}

#[async_trait]
impl RecordStore for FlatFileStore {
    async fn insert(&self, kind: RecordKind, fields: Value) -> Result<Value, AppError> {
        let mut record = as_object(fields)?;
        record.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
        record.insert(
            "createdAt".to_string(),
            serde_json::to_value(Utc::now())?,
        );
        let record = Value::Object(record);
        let json_line = serde_json::to_string(&record)?;

        let _guard = self.lock.lock().await;
        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(kind))
            .await
            .map_err(AppError::from)?;
        file.write_all(json_line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        Ok(record)
    }

    async fn find(&self, kind: RecordKind, filter: Option<&Value>) -> Result<Vec<Value>, AppError> {
        let _guard = self.lock.lock().await;
        let records = self.read_all(kind).await?;

        Ok(match filter {
            Some(filter) => records
                .into_iter()
                .filter(|r| matches_filter(r, filter))
                .collect(),
            None => records,
        })
    }

    async fn update_by_id(
        &self,
        kind: RecordKind,
        id: &str,
        fields: Value,
    ) -> Result<Option<Value>, AppError> {
        let fields = as_object(fields)?;

        let _guard = self.lock.lock().await;
        let mut records = self.read_all(kind).await?;

        let mut updated = None;
        for record in &mut records {
            if record.get("_id").and_then(Value::as_str) == Some(id) {
                if let Some(obj) = record.as_object_mut() {
                    for (k, v) in &fields {
                        if k != "_id" {
                            obj.insert(k.clone(), v.clone());
                        }
                    }
                }
                updated = Some(record.clone());
                break;
            }
        }

        if updated.is_some() {
            self.write_all(kind, &records).await?;
        }

        Ok(updated)
    }

    async fn delete_by_id(&self, kind: RecordKind, id: &str) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let records = self.read_all(kind).await?;

        let remaining: Vec<Value> = records
            .into_iter()
            .filter(|r| r.get("_id").and_then(Value::as_str) != Some(id))
            .collect();

        self.write_all(kind, &remaining).await?;
        Ok(())
    }
}
