//! Background-sync hook.

use async_trait::async_trait;

/// Tag dispatched to the [`SyncHandler`]. Other tags are ignored.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Work to run when a background sync fires, such as replaying queued writes.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync(&self);
}

/// Default handler: logs and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSync;

#[async_trait]
impl SyncHandler for NoopSync {
    async fn sync(&self) {
        tracing::info!(tag = BACKGROUND_SYNC_TAG, "background sync triggered");
    }
}
