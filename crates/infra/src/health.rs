//! Dependency health checks used by the `/health/*` endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::{InMemoryEntityStore, PostgresEntityStore};

/// Upper bound for a single probe.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HealthError {
    #[error("{component} is not configured")]
    NotConfigured { component: &'static str },

    #[error("{component} unavailable: {reason}")]
    Unavailable {
        component: &'static str,
        reason: String,
    },

    #[error("{component} did not answer within {timeout_ms}ms")]
    TimedOut {
        component: &'static str,
        timeout_ms: u128,
    },
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Short component name reported in responses.
    fn component(&self) -> &'static str;

    async fn check(&self) -> Result<(), HealthError>;
}

#[async_trait]
impl<H> HealthCheck for Arc<H>
where
    H: HealthCheck + ?Sized,
{
    fn component(&self) -> &'static str {
        (**self).component()
    }

    async fn check(&self) -> Result<(), HealthError> {
        (**self).check().await
    }
}

/// Run a probe, failing it if it takes longer than `timeout`.
pub async fn check_within(check: &dyn HealthCheck, timeout: Duration) -> Result<(), HealthError> {
    match tokio::time::timeout(timeout, check.check()).await {
        Ok(result) => result,
        Err(_) => Err(HealthError::TimedOut {
            component: check.component(),
            timeout_ms: timeout.as_millis(),
        }),
    }
}

#[async_trait]
impl HealthCheck for PostgresEntityStore {
    fn component(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> Result<(), HealthError> {
        self.ping().await.map_err(|e| HealthError::Unavailable {
            component: "postgres",
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl HealthCheck for InMemoryEntityStore {
    fn component(&self) -> &'static str {
        "in-memory"
    }

    async fn check(&self) -> Result<(), HealthError> {
        Ok(())
    }
}
