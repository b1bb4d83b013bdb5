use std::sync::Arc;

use crate::services::{FeedService, SyncService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub feed_service: Arc<FeedService>,
    pub sync_service: Arc<SyncService>,
}

impl AppState {
    pub fn new(feed_service: FeedService, sync_service: SyncService) -> Self {
        Self {
            feed_service: Arc::new(feed_service),
            sync_service: Arc::new(sync_service),
        }
    }
}
