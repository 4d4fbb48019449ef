use std::sync::Arc;

use crate::config::Config;
use crate::profile::avatar::AssetUploader;
use crate::profile::sessions::SessionRegistry;
use crate::profile::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Profile persistence. Default: `PgProfileStore`.
    pub store: Arc<dyn ProfileStore>,
    /// Avatar storage. Default: `S3AvatarUploader`.
    pub uploader: Arc<dyn AssetUploader>,
    pub sessions: SessionRegistry,
    pub config: Config,
}
