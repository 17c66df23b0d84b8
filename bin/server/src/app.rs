//! HTTP routes.
//!
//! The platform posts every activity to `/api/messages`. Each request is
//! handled to completion on its own task before the response is returned.

use crate::error::ApiError;
use crate::instructions::Instructions;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use deskbridge_channel::{Activity, ActivityType};
use deskbridge_conversation::{ConversationHandler, FeedbackHandler};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Handles message activities.
    pub conversations: ConversationHandler,
    /// Handles feedback submissions.
    pub feedback: FeedbackHandler,
    /// Instructions loaded at startup.
    pub instructions: Instructions,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        conversations: ConversationHandler,
        feedback: FeedbackHandler,
        instructions: Instructions,
    ) -> Self {
        Self {
            conversations,
            feedback,
            instructions,
        }
    }
}

/// Builds the router with request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/messages", post(messages))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Receives one activity from the platform.
async fn messages(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Activity>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(activity) = payload.map_err(|e| ApiError::InvalidActivity(e.body_text()))?;

    match activity.activity_type {
        ActivityType::Message => {
            state.conversations.handle(&activity).await;
            Ok(StatusCode::OK.into_response())
        }
        ActivityType::Invoke if activity.is_feedback() => {
            state.feedback.handle(&activity).await;
            Ok(Json(json!({ "status": 200 })).into_response())
        }
        _ => {
            tracing::debug!(
                activity_type = ?activity.activity_type,
                name = ?activity.name,
                "ignoring activity"
            );
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
