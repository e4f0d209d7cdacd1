//! Multi-camera frame synchronization for rig recordings.
//!
//! Every camera of the rig stamps frames on its own schedule, so a
//! downstream multi-view tool cannot simply pair files by index. This
//! crate discovers each camera's frames, resamples the reference camera's
//! timeline down to a target rate, matches the remaining cameras' frames
//! to the resampled timeline by nearest timestamp, and emits only the
//! reference instants where the whole rig contributed a frame.

mod frames;
mod sync;

pub use frames::*;
pub use sync::*;

use thiserror::Error;

/// Errors produced while discovering or synchronizing frames.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to scan camera folder: {0}")]
    Io(#[from] std::io::Error),
    #[error("start frame {start} is out of range for {available} resampled reference frames")]
    StartFrameOutOfRange { start: usize, available: usize },
}
