//! Profile editing engine.
//!
//! One `ProfileEngine` backs one editing session. It owns the draft, keeps the
//! completion score in step with every change to it, and orchestrates saving
//! through the `ProfileStore` and `AssetUploader` boundaries.
//!
//! Lifecycle: `Uninitialized → Loading → Ready ⇄ Saving`. Field mutations are
//! only accepted in `Ready`; reads are valid in every phase once a draft exists.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::profile::PersistedProfile;
use crate::profile::avatar::{
    preview_data_uri, validate_avatar, AssetUploader, DEFAULT_MAX_AVATAR_BYTES,
};
use crate::profile::completeness::completion_score;
use crate::profile::models::{AvatarState, PendingAvatar, ProfileDraft, ProfileField};
use crate::profile::store::ProfileStore;
use crate::profile::view::ProfileView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Uninitialized,
    Loading,
    Ready,
    Saving,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Profile is not accepting changes (phase: {0:?})")]
    NotReady(EnginePhase),

    #[error("A save is already in progress")]
    ConcurrentSave,

    #[error("Avatar upload failed: {0:#}")]
    Upload(anyhow::Error),

    #[error("Profile persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

struct EngineState {
    phase: EnginePhase,
    draft: Option<ProfileDraft>,
    /// The draft as last loaded from or written to the store, in record form.
    baseline: Option<PersistedProfile>,
    completion: u8,
}

pub struct ProfileEngine {
    state: Mutex<EngineState>,
    max_avatar_bytes: usize,
}

impl Default for ProfileEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AVATAR_BYTES)
    }
}

impl ProfileEngine {
    pub fn new(max_avatar_bytes: usize) -> Self {
        Self {
            state: Mutex::new(EngineState {
                phase: EnginePhase::Uninitialized,
                draft: None,
                baseline: None,
                completion: 0,
            }),
            max_avatar_bytes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn phase(&self) -> EnginePhase {
        self.lock().phase
    }

    #[cfg(test)]
    pub fn completion(&self) -> u8 {
        self.lock().completion
    }

    #[cfg(test)]
    pub fn baseline(&self) -> Option<PersistedProfile> {
        self.lock().baseline.clone()
    }

    pub fn view(&self) -> Result<ProfileView, EngineError> {
        let state = self.lock();
        let draft = state
            .draft
            .as_ref()
            .ok_or(EngineError::NotReady(state.phase))?;
        let unsaved = draft.avatar.pending.is_some()
            || state.baseline.as_ref() != Some(&draft.to_record());
        Ok(ProfileView::new(draft, state.phase, state.completion, unsaved))
    }

    /// Starts a session with an empty draft and waits for `reconcile`.
    /// Calling it again before the load completes replaces the draft.
    pub fn initialize(&self, user_id: Uuid) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.phase == EnginePhase::Saving {
            return Err(EngineError::NotReady(EnginePhase::Saving));
        }

        *state = EngineState {
            phase: EnginePhase::Loading,
            draft: Some(ProfileDraft::new(user_id)),
            baseline: None,
            completion: 0,
        };
        Ok(())
    }

    /// Applies the record loaded at session start. `None` means a new profile
    /// and leaves the defaults in place.
    pub fn reconcile(&self, persisted: Option<PersistedProfile>) -> Result<(), EngineError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        match state.phase {
            EnginePhase::Loading => {}
            EnginePhase::Ready => {
                warn!("Reconciling a profile that is already being edited; local edits are replaced")
            }
            phase => return Err(EngineError::NotReady(phase)),
        }

        let draft = state
            .draft
            .as_mut()
            .ok_or(EngineError::NotReady(state.phase))?;

        if let Some(record) = persisted {
            if record.id != draft.user_id {
                return Err(EngineError::Validation(format!(
                    "Loaded profile {} does not belong to user {}",
                    record.id, draft.user_id
                )));
            }
            draft.overwrite_from(&record);
            state.completion = completion_score(draft);
            state.baseline = Some(draft.to_record());
        }

        state.phase = EnginePhase::Ready;
        Ok(())
    }

    /// Loads the persisted profile from `store` and reconciles it.
    pub async fn load(&self, store: &dyn ProfileStore) -> Result<(), EngineError> {
        let user_id = {
            let state = self.lock();
            match (state.phase, state.draft.as_ref()) {
                (EnginePhase::Loading, Some(draft)) => draft.user_id,
                (phase, _) => return Err(EngineError::NotReady(phase)),
            }
        };

        let persisted = store
            .load_by_id(user_id)
            .await
            .map_err(EngineError::Persistence)?;
        info!(
            "Loaded profile for user {user_id} (existing: {})",
            persisted.is_some()
        );
        self.reconcile(persisted)
    }

    pub fn set_field(&self, name: &str, value: &str) -> Result<(), EngineError> {
        self.mutate(|draft| {
            let field: ProfileField = name.parse().map_err(EngineError::Validation)?;
            draft.set(field, value).map_err(EngineError::Validation)?;
            debug!("Set {} on profile {}", field.as_str(), draft.user_id);
            Ok(())
        })
    }

    /// Returns whether the trimmed tag was added. Blank or duplicate tags are ignored.
    pub fn add_skill(&self, text: &str) -> Result<bool, EngineError> {
        self.mutate(|draft| Ok(draft.skills.insert(text)))
    }

    pub fn remove_skill(&self, text: &str) -> Result<bool, EngineError> {
        self.mutate(|draft| Ok(draft.skills.remove(text)))
    }

    /// Holds `avatar` until the next save and derives a preview for display.
    /// The resolved reference is left alone.
    pub fn set_pending_avatar(&self, avatar: PendingAvatar) -> Result<(), EngineError> {
        let max_bytes = self.max_avatar_bytes;
        self.mutate(move |draft| {
            validate_avatar(&avatar, max_bytes).map_err(EngineError::Validation)?;
            draft.avatar.preview_url = Some(preview_data_uri(&avatar));
            draft.avatar.pending = Some(avatar);
            Ok(())
        })
    }

    /// Uploads a pending avatar (if any), then upserts the draft.
    ///
    /// On failure the draft and baseline are exactly as they were before the
    /// call. A second call while one is in flight fails with `ConcurrentSave`.
    pub async fn save(
        &self,
        store: &dyn ProfileStore,
        uploader: &dyn AssetUploader,
    ) -> Result<PersistedProfile, EngineError> {
        let (user_id, pending, mut record) = {
            let mut state = self.lock();
            match state.phase {
                EnginePhase::Ready => {}
                EnginePhase::Saving => return Err(EngineError::ConcurrentSave),
                phase => return Err(EngineError::NotReady(phase)),
            }
            let draft = state
                .draft
                .as_ref()
                .ok_or(EngineError::NotReady(state.phase))?;
            let snapshot = (
                draft.user_id,
                draft.avatar.pending.clone(),
                draft.to_record(),
            );
            state.phase = EnginePhase::Saving;
            snapshot
        };
        let _in_flight = SaveInFlight { engine: self };

        if let Some(avatar) = &pending {
            let url = uploader.store(user_id, avatar).await.map_err(|e| {
                warn!("Avatar upload failed for user {user_id}: {e:#}");
                EngineError::Upload(e)
            })?;
            record.avatar_url = Some(url);
        }

        store.upsert(user_id, &record).await.map_err(|e| {
            warn!("Profile upsert failed for user {user_id}: {e:#}");
            EngineError::Persistence(e)
        })?;

        {
            let mut guard = self.lock();
            let state = &mut *guard;
            if let Some(draft) = state.draft.as_mut() {
                draft.avatar = AvatarState {
                    resolved_url: record.avatar_url.clone(),
                    pending: None,
                    preview_url: None,
                };
            }
            state.baseline = Some(record.clone());
        }

        info!("Saved profile for user {user_id}");
        Ok(record)
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut ProfileDraft) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.phase != EnginePhase::Ready {
            return Err(EngineError::NotReady(state.phase));
        }
        let draft = state
            .draft
            .as_mut()
            .ok_or(EngineError::NotReady(state.phase))?;

        let before = draft.clone();
        let out = apply(draft)?;
        if *draft != before {
            state.completion = completion_score(draft);
        }
        Ok(out)
    }
}

/// Returns the engine to `Ready` when a save finishes, fails, or is dropped.
struct SaveInFlight<'a> {
    engine: &'a ProfileEngine,
}

impl Drop for SaveInFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.engine.lock();
        if state.phase == EnginePhase::Saving {
            state.phase = EnginePhase::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::profile::models::{CurrentStatus, EducationLevel, ExperienceYears};
    use crate::profile::testing::{png_avatar, MemoryProfileStore, MemoryUploader};

    fn ready_engine(user_id: Uuid) -> ProfileEngine {
        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();
        engine.reconcile(None).unwrap();
        engine
    }

    #[test]
    fn test_reconcile_absent_keeps_defaults() {
        let engine = ready_engine(Uuid::new_v4());
        let view = engine.view().unwrap();
        assert_eq!(view.phase, EnginePhase::Ready);
        assert_eq!(view.current_status, CurrentStatus::Student);
        assert_eq!(view.education_level, EducationLevel::Undergraduate);
        assert!(view.skills.is_empty());
        assert_eq!(view.completion, 0);
        assert!(engine.baseline().is_none());
    }

    #[test]
    fn test_mutations_rejected_before_ready() {
        let engine = ProfileEngine::default();
        assert!(matches!(
            engine.set_field("full_name", "Ada"),
            Err(EngineError::NotReady(EnginePhase::Uninitialized))
        ));
        assert!(engine.view().is_err());

        engine.initialize(Uuid::new_v4()).unwrap();
        assert!(matches!(
            engine.add_skill("Rust"),
            Err(EngineError::NotReady(EnginePhase::Loading))
        ));
        assert_eq!(engine.view().unwrap().phase, EnginePhase::Loading);
    }

    #[test]
    fn test_reinitialize_before_load_replaces_draft() {
        let engine = ProfileEngine::default();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        engine.initialize(first).unwrap();
        engine.initialize(second).unwrap();
        assert_eq!(engine.view().unwrap().user_id, second);
        assert_eq!(engine.phase(), EnginePhase::Loading);
    }

    #[test]
    fn test_reconcile_before_initialize_rejected() {
        let engine = ProfileEngine::default();
        assert!(matches!(
            engine.reconcile(None),
            Err(EngineError::NotReady(EnginePhase::Uninitialized))
        ));
    }

    #[test]
    fn test_unknown_field_is_validation_error() {
        let engine = ready_engine(Uuid::new_v4());
        assert!(matches!(
            engine.set_field("shoe_size", "42"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.set_field("current_status", "retired"),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(engine.view().unwrap().current_status, CurrentStatus::Student);
    }

    #[test]
    fn test_completion_follows_field_edits() {
        let engine = ready_engine(Uuid::new_v4());
        engine.set_field("full_name", "Ada").unwrap();
        engine.set_field("target_job", "Engineer").unwrap();
        assert_eq!(engine.completion(), 60);

        engine.set_field("location", "Remote").unwrap();
        assert_eq!(engine.completion(), 68);

        engine.set_field("location", "").unwrap();
        assert_eq!(engine.completion(), 60);
    }

    #[test]
    fn test_blank_skills_are_noops() {
        let engine = ready_engine(Uuid::new_v4());
        engine.set_field("full_name", "Ada").unwrap();
        let before = engine.view().unwrap();

        assert!(!engine.add_skill("").unwrap());
        assert!(!engine.add_skill("   ").unwrap());

        let after = engine.view().unwrap();
        assert_eq!(after.skills, before.skills);
        assert_eq!(after.completion, before.completion);
    }

    #[test]
    fn test_noops_on_fresh_draft_keep_completion() {
        let engine = ready_engine(Uuid::new_v4());
        assert_eq!(engine.completion(), 0);

        assert!(!engine.add_skill("").unwrap());
        assert!(!engine.add_skill("   ").unwrap());
        assert!(!engine.remove_skill("absent").unwrap());
        engine.set_field("full_name", "").unwrap();
        engine.set_field("current_status", "student").unwrap();

        assert_eq!(engine.completion(), 0);
    }

    #[test]
    fn test_unsaved_changes_track_baseline() {
        let user_id = Uuid::new_v4();
        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();
        engine
            .reconcile(Some(PersistedProfile {
                full_name: Some("Ada".to_string()),
                ..PersistedProfile::new(user_id)
            }))
            .unwrap();
        assert!(!engine.view().unwrap().has_unsaved_changes);

        engine.set_field("full_name", "Ada L.").unwrap();
        assert!(engine.view().unwrap().has_unsaved_changes);

        engine.set_field("full_name", "Ada").unwrap();
        assert!(!engine.view().unwrap().has_unsaved_changes);

        engine.set_pending_avatar(png_avatar()).unwrap();
        assert!(engine.view().unwrap().has_unsaved_changes);
    }

    #[test]
    fn test_add_then_remove_skill_round_trips() {
        let engine = ready_engine(Uuid::new_v4());
        engine.add_skill("SQL").unwrap();
        let before = engine.view().unwrap().skills;

        assert!(engine.add_skill("  Kubernetes ").unwrap());
        assert!(!engine.add_skill("Kubernetes").unwrap());
        assert!(engine.remove_skill("Kubernetes").unwrap());
        assert!(!engine.remove_skill("kubernetes").unwrap());

        assert_eq!(engine.view().unwrap().skills, before);
    }

    #[test]
    fn test_hidden_experience_years_survive_status_round_trip() {
        let engine = ready_engine(Uuid::new_v4());
        engine.set_field("current_status", "working").unwrap();
        engine.set_field("experience_years", "3-5").unwrap();

        engine.set_field("current_status", "student").unwrap();
        let hidden = engine.view().unwrap();
        assert_eq!(hidden.experience_years, None);
        assert!(!hidden.visibility.experience_years_visible);

        engine.set_field("current_status", "working").unwrap();
        let shown = engine.view().unwrap();
        assert_eq!(shown.experience_years, Some(ExperienceYears::ThreeToFive));
        assert_eq!(shown.visibility.affiliation_label, "Company/Organization");
    }

    #[test]
    fn test_reconcile_applies_persisted_record() {
        let user_id = Uuid::new_v4();
        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();

        let record = PersistedProfile {
            full_name: Some("Grace".to_string()),
            current_status: Some("working".to_string()),
            education_level: Some("PhD".to_string()),
            target_job: Some("Staff Engineer".to_string()),
            experience_years: Some("10+".to_string()),
            skills: Some("COBOL, compilers,, ".to_string()),
            location: Some("Arlington".to_string()),
            avatar_url: Some("https://cdn.example.test/grace.png".to_string()),
            ..PersistedProfile::new(user_id)
        };
        engine.reconcile(Some(record.clone())).unwrap();

        let view = engine.view().unwrap();
        assert_eq!(view.full_name, "Grace");
        assert_eq!(view.education_level, EducationLevel::Doctorate);
        assert_eq!(view.experience_years, Some(ExperienceYears::TenPlus));
        assert_eq!(view.skills.iter().collect::<Vec<_>>(), vec!["COBOL", "compilers"]);
        assert_eq!(view.avatar_url.as_deref(), Some("https://cdn.example.test/grace.png"));
        assert_eq!(view.visibility.education_detail_label, "Program/Field");
        // 4/4 required, 1/5 optional
        assert_eq!(view.completion, 68);
        assert!(!view.has_unsaved_changes);

        let baseline = engine.baseline().unwrap();
        assert_eq!(baseline.full_name, record.full_name);
        assert_eq!(baseline.skills.as_deref(), Some("COBOL,compilers"));
        assert_eq!(baseline.avatar_url, record.avatar_url);
    }

    #[test]
    fn test_reconcile_rejects_foreign_record() {
        let engine = ProfileEngine::default();
        engine.initialize(Uuid::new_v4()).unwrap();
        let result = engine.reconcile(Some(PersistedProfile::new(Uuid::new_v4())));
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(engine.phase(), EnginePhase::Loading);
    }

    #[test]
    fn test_pending_avatar_previews_without_touching_resolved() {
        let user_id = Uuid::new_v4();
        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();
        engine
            .reconcile(Some(PersistedProfile {
                avatar_url: Some("https://cdn.example.test/old.png".to_string()),
                ..PersistedProfile::new(user_id)
            }))
            .unwrap();

        engine.set_pending_avatar(png_avatar()).unwrap();
        let view = engine.view().unwrap();
        assert!(view.has_pending_avatar);
        assert!(view
            .avatar_url
            .as_deref()
            .is_some_and(|u| u.starts_with("data:image/png;base64,")));
        assert_eq!(
            engine.baseline().and_then(|b| b.avatar_url).as_deref(),
            Some("https://cdn.example.test/old.png")
        );
    }

    #[test]
    fn test_non_image_avatar_rejected() {
        let engine = ready_engine(Uuid::new_v4());
        let mut avatar = png_avatar();
        avatar.content_type = "text/plain".to_string();
        assert!(matches!(
            engine.set_pending_avatar(avatar),
            Err(EngineError::Validation(_))
        ));
        assert!(!engine.view().unwrap().has_pending_avatar);
    }

    #[tokio::test]
    async fn test_load_reconciles_from_store() {
        let user_id = Uuid::new_v4();
        let store = MemoryProfileStore::with_record(PersistedProfile {
            full_name: Some("Linus".to_string()),
            ..PersistedProfile::new(user_id)
        });
        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();
        engine.load(&store).await.unwrap();

        assert_eq!(engine.phase(), EnginePhase::Ready);
        assert_eq!(engine.view().unwrap().full_name, "Linus");
    }

    #[tokio::test]
    async fn test_save_uploads_then_upserts() {
        let user_id = Uuid::new_v4();
        let store = MemoryProfileStore::default();
        let uploader = MemoryUploader::default();
        let engine = ready_engine(user_id);
        engine.set_field("full_name", "Ada").unwrap();
        engine.set_field("current_status", "student").unwrap();
        engine.set_field("experience_years", "1-3").unwrap();
        engine.add_skill("Rust").unwrap();
        engine.add_skill("SQL").unwrap();
        engine.set_pending_avatar(png_avatar()).unwrap();

        let saved = engine.save(&store, &uploader).await.unwrap();

        assert_eq!(uploader.upload_count(), 1);
        assert_eq!(store.upsert_count(), 1);
        assert_eq!(saved.skills.as_deref(), Some("Rust,SQL"));
        assert_eq!(saved.experience_years, None);
        let url = saved.avatar_url.clone().unwrap();
        assert!(url.starts_with("https://cdn.example.test/avatars/"));

        let view = engine.view().unwrap();
        assert_eq!(view.phase, EnginePhase::Ready);
        assert!(!view.has_pending_avatar);
        assert!(!view.has_unsaved_changes);
        assert_eq!(view.avatar_url.as_deref(), Some(url.as_str()));
        assert_eq!(store.record(user_id), Some(saved.clone()));
        assert_eq!(engine.baseline(), Some(saved));
    }

    #[tokio::test]
    async fn test_save_without_avatar_skips_upload() {
        let store = MemoryProfileStore::default();
        let uploader = MemoryUploader::default();
        let engine = ready_engine(Uuid::new_v4());
        engine.set_field("bio", "Hello").unwrap();

        let saved = engine.save(&store, &uploader).await.unwrap();
        assert_eq!(uploader.upload_count(), 0);
        assert_eq!(saved.avatar_url, None);
        assert_eq!(saved.bio.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_save() {
        let user_id = Uuid::new_v4();
        let store = MemoryProfileStore::default();
        let uploader = MemoryUploader::default();
        uploader.fail_uploads(true);

        let engine = ProfileEngine::default();
        engine.initialize(user_id).unwrap();
        engine
            .reconcile(Some(PersistedProfile {
                full_name: Some("Ada".to_string()),
                avatar_url: Some("https://cdn.example.test/old.png".to_string()),
                ..PersistedProfile::new(user_id)
            }))
            .unwrap();
        engine.set_pending_avatar(png_avatar()).unwrap();
        let before = engine.view().unwrap();
        let baseline_before = engine.baseline();

        let result = engine.save(&store, &uploader).await;

        assert!(matches!(result, Err(EngineError::Upload(_))));
        assert_eq!(store.upsert_count(), 0);
        assert_eq!(engine.view().unwrap(), before);
        assert_eq!(engine.baseline(), baseline_before);
        assert_eq!(engine.phase(), EnginePhase::Ready);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_draft_unchanged() {
        let store = MemoryProfileStore::default();
        store.fail_upserts(true);
        let uploader = MemoryUploader::default();
        let engine = ready_engine(Uuid::new_v4());
        engine.set_field("full_name", "Ada").unwrap();
        engine.set_pending_avatar(png_avatar()).unwrap();
        let before = engine.view().unwrap();

        let result = engine.save(&store, &uploader).await;

        assert!(matches!(result, Err(EngineError::Persistence(_))));
        assert_eq!(engine.view().unwrap(), before);
        assert!(engine.baseline().is_none());

        // The pending avatar is still there, so a retry uploads again.
        store.fail_upserts(false);
        engine.save(&store, &uploader).await.unwrap();
        assert_eq!(uploader.upload_count(), 2);
        assert_eq!(store.upsert_count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_save_rejected() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MemoryProfileStore::default());
        let uploader = Arc::new(MemoryUploader::gated(gate.clone()));
        let engine = Arc::new(ready_engine(Uuid::new_v4()));
        engine.set_field("full_name", "Ada").unwrap();
        engine.set_pending_avatar(png_avatar()).unwrap();

        let first = tokio::spawn({
            let (engine, store, uploader) = (engine.clone(), store.clone(), uploader.clone());
            async move { engine.save(store.as_ref(), uploader.as_ref()).await }
        });
        while engine.phase() != EnginePhase::Saving {
            tokio::task::yield_now().await;
        }

        let second = engine.save(store.as_ref(), uploader.as_ref()).await;
        assert!(matches!(second, Err(EngineError::ConcurrentSave)));
        assert!(matches!(
            engine.set_field("bio", "late edit"),
            Err(EngineError::NotReady(EnginePhase::Saving))
        ));
        let during = engine.view().unwrap();
        assert_eq!(during.phase, EnginePhase::Saving);
        assert_eq!(during.full_name, "Ada");

        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(uploader.upload_count(), 1);
        assert_eq!(store.upsert_count(), 1);
        assert_eq!(engine.phase(), EnginePhase::Ready);
        engine.set_field("bio", "after save").unwrap();
    }
}
