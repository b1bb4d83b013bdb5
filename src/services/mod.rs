pub mod feed;
pub mod preference;
pub mod providers;
pub mod ranking;
pub mod similarity;
pub mod sync;
pub mod vectorizer;

pub use feed::{FeedQuery, FeedService, FeedSettings};
pub use ranking::{LinearScanRanker, Ranker};
pub use sync::{SyncReport, SyncService};
