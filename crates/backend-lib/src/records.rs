// ============================
// taskchat-backend-lib/src/records.rs
// ============================
//! HTTP record API: stateless REST wrappers over the record store.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::store::{RecordKind, RecordStore};
use crate::AppState;

/// Create the record API router
pub fn create_router<S: RecordStore + Clone + Send + Sync + 'static>(
    state: Arc<AppState<S>>,
) -> Router {
    Router::new()
        .route("/users", get(list_users::<S>).post(create_user::<S>))
        .route("/todos", get(list_todos::<S>).post(create_todo::<S>))
        .route(
            "/todos/{id}",
            put(update_todo::<S>).delete(delete_todo::<S>),
        )
        .route(
            "/conversations",
            get(list_conversations::<S>).post(create_conversation::<S>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    name: String,
}

async fn create_user<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .insert(RecordKind::User, json!({ "name": body.name }))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.store.find(RecordKind::User, None).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTodo {
    text: String,
    #[serde(default)]
    user_id: Option<String>,
}

async fn create_todo<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateTodo>,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = json!({
        "text": body.text,
        "completed": false,
    });
    if let Some(user_id) = body.user_id {
        fields["userId"] = Value::String(user_id);
    }

    let todo = state.store.insert(RecordKind::Todo, fields).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn list_todos<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.store.find(RecordKind::Todo, None).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateTodo {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

/// Updating an unknown id responds 200 with a JSON `null` body, matching the
/// behavior of the API this replaces.
async fn update_todo<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodo>,
) -> Result<Json<Value>, AppError> {
    let mut fields = serde_json::Map::new();
    if let Some(text) = body.text {
        fields.insert("text".to_string(), Value::String(text));
    }
    if let Some(completed) = body.completed {
        fields.insert("completed".to_string(), Value::Bool(completed));
    }

    let updated = state
        .store
        .update_by_id(RecordKind::Todo, &id, Value::Object(fields))
        .await?;
    Ok(Json(updated.unwrap_or(Value::Null)))
}

async fn delete_todo<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete_by_id(RecordKind::Todo, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CreateConversation {
    participants: Vec<String>,
}

async fn create_conversation<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateConversation>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = state
        .store
        .insert(
            RecordKind::Conversation,
            json!({ "participants": body.participants }),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Listing embeds the participant user records in place of their ids, the
/// way the API this replaces populated them. A dangling participant id
/// resolves to `null`.
async fn list_conversations<S: RecordStore + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let users = state.store.find(RecordKind::User, None).await?;
    let mut conversations = state.store.find(RecordKind::Conversation, None).await?;

    for conversation in &mut conversations {
        let Some(participants) = conversation
            .get_mut("participants")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for participant in participants.iter_mut() {
            let resolved = participant.as_str().and_then(|id| {
                users
                    .iter()
                    .find(|user| user.get("_id").and_then(Value::as_str) == Some(id))
            });
            *participant = resolved.cloned().unwrap_or(Value::Null);
        }
    }

    Ok(Json(conversations))
}
