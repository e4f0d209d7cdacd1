//! # Rig Core
//!
//! Common types for working with recordings captured by a head-mounted
//! multi-camera rig: several grayscale tracking cameras plus one or two
//! depth cameras, each writing timestamped image files and a per-frame
//! pose log.
//!
//! This crate holds the pieces every other crate in the workspace needs:
//! the camera registry with its fixed calibration constants, sensor pose
//! newtypes, the pose-log reader that composes absolute camera poses from
//! the recorder's two relative transforms, and a numerically robust
//! rotation-matrix to quaternion converter used when exporting poses.

mod camera;
mod pose;
mod pose_log;
mod quat;

pub use camera::*;
pub use nalgebra;
pub use pose::*;
pub use pose_log::*;
pub use quat::*;

use thiserror::Error;

/// Errors produced while reading recording metadata.
///
/// Per-record rejections (malformed lines, tracking-loss poses) are not
/// errors; they are skipped and logged. Only structural failures such as a
/// missing or unreadable pose log surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read pose log: {0}")]
    Io(#[from] std::io::Error),
}
