use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::middleware::SessionId;
use crate::api::ApiError;
use crate::application::{
    session::SharedSession, CatalogService, ChatService, DocumentService, SessionRegistry,
    UploadService,
};
use crate::domain::ports::FileSearchApi;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub documents: Arc<DocumentService>,
    pub uploads: Arc<UploadService>,
    pub chat: Arc<ChatService>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(api: Arc<dyn FileSearchApi>, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(CatalogService::new(
            api.clone(),
            config.cache_ttl(),
            config.config.pagination.page_size,
        ));

        let mut uploads = UploadService::new(api.clone(), catalog.clone())
            .with_policy(config.config.upload.poll_policy());
        if let Some(dir) = &config.config.upload.staging_dir {
            uploads = uploads.with_staging_dir(dir.clone());
        }

        Self {
            documents: Arc::new(DocumentService::new(api.clone(), catalog.clone())),
            uploads: Arc::new(uploads),
            chat: Arc::new(ChatService::new(api)),
            catalog,
            sessions: Arc::new(SessionRegistry::new(
                config.config.session.idle_timeout(),
                config.config.session.max_sessions,
            )),
            config,
        }
    }
}

/// The caller's session, resolved from the id set by the session middleware.
pub struct CurrentSession {
    pub id: SessionId,
    pub session: SharedSession,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let id = parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or_else(|| ApiError::bad_request("missing session"))?;
        let session = state.sessions.get_or_create(id.0)?;
        Ok(Self { id, session })
    }
}
