use crate::Error;
use log::info;
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};

/// Per-pixel unit-plane ray directions for one depth camera.
///
/// Entry `(row, col)` holds the x and y coordinates of the ray through
/// that pixel on the virtual image plane at z = -1. Rays with infinite
/// components mark pixels that are permanently invalid, such as the raster
/// corners outside the lens's field of view.
#[derive(Debug, Clone)]
pub struct RayTable {
    u: DMatrix<f32>,
    v: DMatrix<f32>,
}

impl RayTable {
    /// Parses the recorder's interleaved ray-table bytes for a
    /// `width` x `height` raster.
    ///
    /// The file is a flat little-endian `f32` sequence alternating x and
    /// y. Each deinterleaved half is stored column-major relative to the
    /// raster, so loading it as the columns of a height-by-width matrix
    /// performs the required reshape and transpose in one step.
    pub fn from_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self, Error> {
        let expected = 2 * width * height;
        if bytes.len() != expected * 4 {
            return Err(Error::RayTableSize {
                expected,
                actual: bytes.len() / 4,
                width,
                height,
            });
        }
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let xs: Vec<f32> = floats.iter().copied().step_by(2).collect();
        let ys: Vec<f32> = floats.iter().copied().skip(1).step_by(2).collect();
        Ok(Self {
            u: DMatrix::from_column_slice(height, width, &xs),
            v: DMatrix::from_column_slice(height, width, &ys),
        })
    }

    /// Reads a ray-table binary file for a `width` x `height` raster.
    pub fn from_file(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self, Error> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes, width, height)
    }

    /// Raster width in pixels.
    pub fn width(&self) -> usize {
        self.u.ncols()
    }

    /// Raster height in pixels.
    pub fn height(&self) -> usize {
        self.u.nrows()
    }

    /// Ray-plane coordinates of the pixel at the given raster position.
    pub fn ray(&self, row: usize, col: usize) -> (f32, f32) {
        (self.u[(row, col)], self.v[(row, col)])
    }
}

/// Lazily-loaded ray table for one depth camera.
///
/// The table dimensions come from the first decoded frame, so the cache
/// defers loading until then, and the loaded table is reused for every
/// later frame of the same camera. Nothing invalidates it within a run.
#[derive(Debug)]
pub struct RayTableCache {
    path: PathBuf,
    table: Option<RayTable>,
}

impl RayTableCache {
    /// Creates an empty cache for the table at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path, table: None }
    }

    /// Returns the cached table, loading it on first use with the raster
    /// dimensions of the frame being processed.
    pub fn get_or_load(&mut self, width: usize, height: usize) -> Result<&RayTable, Error> {
        let table = match self.table.take() {
            Some(table) => table,
            None => {
                info!("loading ray table from {}", self.path.display());
                RayTable::from_file(&self.path, width, height)?
            }
        };
        Ok(self.table.insert(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleave(xs: &[f32], ys: &[f32]) -> Vec<u8> {
        xs.iter()
            .zip(ys)
            .flat_map(|(x, y)| {
                let mut bytes = x.to_le_bytes().to_vec();
                bytes.extend_from_slice(&y.to_le_bytes());
                bytes
            })
            .collect()
    }

    #[test]
    fn deinterleaves_and_transposes_to_raster_order() {
        // Column-major halves for a 2x2 raster: [r0c0, r1c0, r0c1, r1c1].
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [-1.0, -2.0, -3.0, -4.0];
        let table = RayTable::from_bytes(&interleave(&xs, &ys), 2, 2).unwrap();

        assert_eq!(table.width(), 2);
        assert_eq!(table.height(), 2);
        assert_eq!(table.ray(0, 0), (1.0, -1.0));
        assert_eq!(table.ray(1, 0), (2.0, -2.0));
        assert_eq!(table.ray(0, 1), (3.0, -3.0));
        assert_eq!(table.ray(1, 1), (4.0, -4.0));
    }

    #[test]
    fn rejects_wrong_length() {
        let bytes = vec![0u8; 3 * 4];
        match RayTable::from_bytes(&bytes, 2, 2) {
            Err(Error::RayTableSize {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 3);
            }
            other => panic!("expected a size error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn preserves_infinite_rays() {
        let xs = [f32::INFINITY, 0.0];
        let ys = [0.0, f32::NEG_INFINITY];
        let table = RayTable::from_bytes(&interleave(&xs, &ys), 2, 1).unwrap();
        assert!(table.ray(0, 0).0.is_infinite());
        assert!(table.ray(0, 1).1.is_infinite());
    }
}
