//! Sampler error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reading an input channel.
///
/// None of these are fatal: the sampler folds every one of them into
/// "no vehicle present" and only logs the change in channel health.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Nothing has been published on the channel yet.
    #[error("no value published yet")]
    NoData,

    /// The channel exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The channel's timestamp is ahead of the wall clock.
    #[error("value is stamped {}ms in the future", ahead.as_millis())]
    FromFuture { ahead: Duration },

    /// The channel held something other than a presence flag.
    #[error("unexpected channel contents {contents:?}")]
    Malformed { contents: String },
}
