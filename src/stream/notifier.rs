//! Downstream side effects of item lifecycle changes.
//!
//! Notification delivery, search-index upkeep and cleanup of related
//! resources live behind [`Notifier`]. The reactor isolates notifier
//! failures per record.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// A lifecycle notice for downstream systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An item was created; index it and announce it.
    Created { item_id: String, name: Option<String> },
    /// An item moved to the inactive status.
    Deactivated {
        item_id: String,
        previous_status: Option<String>,
    },
    /// An item was deleted; clean up what hangs off it.
    Removed { item_id: String },
}

impl Notice {
    pub fn item_id(&self) -> &str {
        match self {
            Notice::Created { item_id, .. }
            | Notice::Deactivated { item_id, .. }
            | Notice::Removed { item_id } => item_id,
        }
    }
}

/// Notifier errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Interface to notification / indexing collaborators.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice) -> Result<(), NotifyError>;
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        match &notice {
            Notice::Created { item_id, name } => {
                info!(item_id = %item_id, name = ?name, "Item created");
            }
            Notice::Deactivated {
                item_id,
                previous_status,
            } => {
                info!(item_id = %item_id, previous_status = ?previous_status, "Item deactivated");
            }
            Notice::Removed { item_id } => {
                info!(item_id = %item_id, "Item deleted");
            }
        }
        Ok(())
    }
}

/// Notifier that records notices, for tests.
#[derive(Default)]
pub struct MockNotifier {
    notices: RwLock<Vec<Notice>>,
    fail: RwLock<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.notices.read().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        if *self.fail.read().await {
            return Err(NotifyError::Delivery(format!(
                "injected failure for {}",
                notice.item_id()
            )));
        }
        self.notices.write().await.push(notice);
        Ok(())
    }
}
