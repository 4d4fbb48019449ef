//! Axum route handlers for the Profile API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::PersistedProfile;
use crate::navigation::{next_section, NavigationEvent, Section};
use crate::profile::completeness::completion_score;
use crate::profile::engine::ProfileEngine;
use crate::profile::models::{PendingAvatar, ProfileDraft};
use crate::profile::view::ProfileView;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub profile: ProfileView,
}

#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillRequest {
    pub skill: String,
}

#[derive(Debug, Serialize)]
pub struct SkillResponse {
    pub changed: bool,
    pub profile: ProfileView,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub profile: ProfileView,
    pub next_section: Section,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    pub to: Option<Section>,
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    pub next_section: Section,
}

#[derive(Debug, Serialize)]
pub struct StoredProfileResponse {
    pub profile: PersistedProfile,
    pub completion: u8,
}

async fn session(state: &AppState, session_id: Uuid) -> Result<Arc<ProfileEngine>, AppError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Profile session {session_id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/profile/sessions
///
/// Starts an editing session: initialize, load the stored profile, reconcile.
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let engine = Arc::new(ProfileEngine::new(state.config.max_avatar_bytes));
    engine.initialize(req.user_id)?;
    engine.load(state.store.as_ref()).await?;

    let session_id = state.sessions.open(engine.clone()).await;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            profile: engine.view()?,
        }),
    ))
}

/// GET /api/v1/profile/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ProfileView>, AppError> {
    let engine = session(&state, session_id).await?;
    Ok(Json(engine.view()?))
}

/// DELETE /api/v1/profile/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Profile session {session_id} not found"
        )))
    }
}

/// PATCH /api/v1/profile/sessions/:id/fields
pub async fn handle_set_field(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<ProfileView>, AppError> {
    let engine = session(&state, session_id).await?;
    engine.set_field(&req.field, &req.value)?;
    Ok(Json(engine.view()?))
}

/// POST /api/v1/profile/sessions/:id/skills
pub async fn handle_add_skill(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SkillRequest>,
) -> Result<Json<SkillResponse>, AppError> {
    let engine = session(&state, session_id).await?;
    let changed = engine.add_skill(&req.skill)?;
    Ok(Json(SkillResponse {
        changed,
        profile: engine.view()?,
    }))
}

/// DELETE /api/v1/profile/sessions/:id/skills
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SkillRequest>,
) -> Result<Json<SkillResponse>, AppError> {
    let engine = session(&state, session_id).await?;
    let changed = engine.remove_skill(&req.skill)?;
    Ok(Json(SkillResponse {
        changed,
        profile: engine.view()?,
    }))
}

/// PUT /api/v1/profile/sessions/:id/avatar
///
/// Multipart upload; the image is read from the `avatar` field and held as
/// pending until the next save.
pub async fn handle_set_avatar(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ProfileView>, AppError> {
    let engine = session(&state, session_id).await?;

    let mut avatar = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = field.file_name().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read avatar: {e}")))?;
        avatar = Some(PendingAvatar {
            bytes,
            content_type,
            file_name,
        });
        break;
    }

    let avatar =
        avatar.ok_or_else(|| AppError::Validation("Missing 'avatar' file field".to_string()))?;
    engine.set_pending_avatar(avatar)?;
    Ok(Json(engine.view()?))
}

/// POST /api/v1/profile/sessions/:id/save
///
/// Runs the save on its own task so it reaches a terminal outcome even if
/// the client disconnects.
pub async fn handle_save(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    let engine = session(&state, session_id).await?;

    let saved = tokio::spawn({
        let engine = engine.clone();
        let store = state.store.clone();
        let uploader = state.uploader.clone();
        async move { engine.save(store.as_ref(), uploader.as_ref()).await }
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Save task failed: {e}")))??;

    info!("Profile session {session_id} saved user {}", saved.id);
    Ok(Json(SaveResponse {
        profile: engine.view()?,
        next_section: next_section(NavigationEvent::ProfileSaved),
    }))
}

/// POST /api/v1/profile/sessions/:id/skip
///
/// Leaves the editor without saving; defaults to the roadmap.
pub async fn handle_skip(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    body: Option<Json<SkipRequest>>,
) -> Result<Json<SkipResponse>, AppError> {
    if !state.sessions.close(session_id).await {
        return Err(AppError::NotFound(format!(
            "Profile session {session_id} not found"
        )));
    }

    let event = match body.and_then(|Json(req)| req.to) {
        Some(section) => NavigationEvent::Goto(section),
        None => NavigationEvent::ProfileSkipped,
    };
    Ok(Json(SkipResponse {
        next_section: next_section(event),
    }))
}

/// GET /api/v1/profiles/:user_id
///
/// Stored profile and its completion, without opening a session.
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<StoredProfileResponse>, AppError> {
    let profile = state
        .store
        .load_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;

    let mut draft = ProfileDraft::new(user_id);
    draft.overwrite_from(&profile);
    Ok(Json(StoredProfileResponse {
        completion: completion_score(&draft),
        profile,
    }))
}
