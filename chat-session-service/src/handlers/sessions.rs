use crate::dtos::{
    AppendMessagesRequest, CreateSessionRequest, CreatedSessionResponse, ListSessionsParams,
};
use crate::middleware::{AuthenticatedUser, SessionId, ValidatedJson};
use crate::models::{Message, Session};
use crate::startup::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use service_core::error::AppError;
use service_core::response::ApiResponse;

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    params: Result<Query<ListSessionsParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<Session>>, AppError> {
    let Query(params) = params.map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("user_id query parameter must be an integer"))
    })?;

    tracing::debug!(caller = %user.uid(), user_id = params.user_id, "Listing chat sessions");

    let sessions = state.store.list_by_user(params.user_id).await?;

    Ok(ApiResponse::ok(
        "Chat sessions retrieved successfully",
        sessions,
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    SessionId(id): SessionId,
) -> Result<ApiResponse<Session>, AppError> {
    tracing::debug!(caller = %user.uid(), session_id = id, "Fetching chat session");

    let session = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Session not found")))?;

    Ok(ApiResponse::ok("Chat session retrieved successfully", session))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateSessionRequest>,
) -> Result<ApiResponse<CreatedSessionResponse>, AppError> {
    let conversation: Vec<Message> = payload.conversation.into_iter().map(Into::into).collect();

    let session_id = state
        .store
        .create(payload.user_id, &payload.session_name, conversation)
        .await?;

    tracing::info!(
        caller = %user.uid(),
        session_id,
        user_id = payload.user_id,
        "Chat session created via API"
    );

    Ok(ApiResponse::created(
        "Chat session created successfully",
        CreatedSessionResponse { session_id },
    ))
}

pub async fn append_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    SessionId(id): SessionId,
    ValidatedJson(payload): ValidatedJson<AppendMessagesRequest>,
) -> Result<ApiResponse<()>, AppError> {
    let messages: Vec<Message> = payload.messages.into_iter().map(Into::into).collect();
    let count = messages.len();

    state.store.append_messages(id, messages).await?;

    tracing::info!(caller = %user.uid(), session_id = id, count, "Messages appended via API");

    Ok(ApiResponse::ok_message("Chat session updated successfully"))
}

pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    SessionId(id): SessionId,
) -> Result<ApiResponse<()>, AppError> {
    state.store.delete(id).await?;

    tracing::info!(caller = %user.uid(), session_id = id, "Chat session deleted via API");

    Ok(ApiResponse::ok_message(format!(
        "Chat session with ID {} deleted successfully",
        id
    )))
}
