//! Error types for the watch layer.

use crate::WatchId;

/// Errors that can occur when signalling a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch task has stopped (its session ended or was replaced) and
    /// no longer accepts signals.
    #[error("watch {0} is unavailable")]
    Unavailable(WatchId),
}
