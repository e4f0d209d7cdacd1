use crate::Error;
use image::{ImageBuffer, Luma};
use nalgebra::DMatrix;
use std::path::Path;

/// An encoded depth raster as stored by the recorder.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Decodes one packed depth sample into a metric distance.
///
/// The recorder stores each 16-bit sample with its byte pair swapped
/// relative to the raster container's sample order; undoing the swap and
/// reading the result as millimeters reproduces the encoding bit for bit.
/// This quirk is part of the device's format and must not be replaced by
/// reading the raster with the opposite endianness.
#[inline]
pub fn decode_depth_sample(encoded: u16) -> f64 {
    f64::from(encoded.swap_bytes()) / 1000.0
}

/// Decodes an encoded depth raster into a distance map in meters.
///
/// The map has the same shape as the raster; no filtering is applied.
pub fn decode_depth_image(image: &DepthImage) -> DMatrix<f64> {
    let (width, height) = image.dimensions();
    DMatrix::from_fn(height as usize, width as usize, |row, col| {
        decode_depth_sample(image.get_pixel(col as u32, row as u32)[0])
    })
}

/// Reads an encoded depth image file.
pub fn read_depth_image(path: impl AsRef<Path>) -> Result<DepthImage, Error> {
    Ok(image::open(path.as_ref())?.into_luma16())
}
