//! Constants for the download module (timeouts, concurrency bounds).

use std::time::Duration;

/// HTTP connect timeout for image requests (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-image deadline covering request and body streaming.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of images in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;
