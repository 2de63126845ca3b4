use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::access::{
    LectureLookup, PermissionResolver, PgLectureLookup, PgPermissionResolver,
};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    access: Arc<dyn PermissionResolver>,
    lectures: Arc<dyn LectureLookup>,
}

impl AppState {
    pub fn new(settings: Settings, db: PgPool) -> Self {
        let access = Arc::new(PgPermissionResolver::new(db.clone()));
        let lectures = Arc::new(PgLectureLookup::new(db.clone()));
        Self::with_collaborators(settings, db, access, lectures)
    }

    /// Wire in alternative permission/lecture collaborators. The embedding
    /// layer owns both subsystems; the defaults in `new` only cover the
    /// single-database deployment.
    pub fn with_collaborators(
        settings: Settings,
        db: PgPool,
        access: Arc<dyn PermissionResolver>,
        lectures: Arc<dyn LectureLookup>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, access, lectures }) }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn access(&self) -> &dyn PermissionResolver {
        self.inner.access.as_ref()
    }

    pub fn lectures(&self) -> &dyn LectureLookup {
        self.inner.lectures.as_ref()
    }
}
