//! Exam lifecycle and secure grading core of the lectio academy backend.
//!
//! The embedding request layer (transport, authentication, session
//! resolution) lives outside this crate. It resolves the caller to a
//! [`services::access::Requester`] and invokes the operations in
//! [`services::exam_aggregate`], [`services::grading`] and
//! [`services::statistics`] against a shared [`core::state::AppState`].

pub mod core;
pub mod db;
pub(crate) mod repositories;
pub mod schemas;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

/// Load configuration, initialize telemetry, connect the pool and run
/// migrations. Returns the state handle the embedding layer threads into
/// every service call.
pub async fn bootstrap() -> anyhow::Result<crate::core::state::AppState> {
    dotenvy::dotenv().ok();

    let settings = crate::core::config::Settings::load()?;
    crate::core::telemetry::init_tracing(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    tracing::info!(
        environment = %settings.runtime().environment,
        "lectio exam core ready"
    );

    Ok(crate::core::state::AppState::new(settings, db_pool))
}
