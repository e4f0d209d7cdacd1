//! Depth-image decoding and point-cloud reconstruction for the rig's
//! depth cameras.
//!
//! A depth frame goes through three stages: the packed 16-bit samples are
//! decoded into a metric distance map, the camera's ray table supplies a
//! per-pixel direction on the virtual image plane, and the reconstructor
//! unprojects every valid pixel into a 3D point, optionally placed in the
//! world through a sensor pose. Writers for the OBJ and PLY point-cloud
//! artifacts consumed by downstream tools live here as well.

mod codec;
mod export;
mod ray_table;
mod reconstruct;

pub use codec::*;
pub use export::*;
pub use ray_table::*;
pub use reconstruct::*;

use thiserror::Error;

/// Errors produced while loading depth inputs or reconstructing points.
///
/// Per-pixel rejections (invalid rays, out-of-range distances) are never
/// errors; they simply contribute no point. Only structural problems with
/// the input files surface here, and they abort the affected camera.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read depth input: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to decode depth image: {0}")]
    Image(#[from] image::ImageError),
    #[error(
        "ray table holds {actual} floats but a {width}x{height} raster needs {expected}"
    )]
    RayTableSize {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },
    #[error(
        "distance map is {map_width}x{map_height} but the ray table is {table_width}x{table_height}"
    )]
    DimensionMismatch {
        map_width: usize,
        map_height: usize,
        table_width: usize,
        table_height: usize,
    },
}
