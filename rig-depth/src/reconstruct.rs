use crate::{Error, RayTable};
use nalgebra::{DMatrix, Matrix3, Point3, Vector3};
use rig_core::{DepthRange, SensorToWorld};

/// How a decoded distance value relates to its pixel's ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnprojectionModel {
    /// The decoded value is the Euclidean distance along the normalized
    /// ray `(-x, -y, -1)` through the pixel.
    DirectionDistance,
    /// The decoded value is a radial distance converted to the axial
    /// depth `z = -D / sqrt(x^2 + y^2 + 1)` along `(x, y, 1)`.
    DepthAlongNormal,
}

/// Unprojects a decoded distance map into 3D points.
///
/// Points are placed in world coordinates when a pose is supplied and
/// stay in camera-local coordinates otherwise. A pixel contributes
/// nothing when its ray has an infinite component or its distance falls
/// outside the camera's calibrated window; neither is an error.
pub fn reconstruct_points(
    distances: &DMatrix<f64>,
    rays: &RayTable,
    pose: Option<&SensorToWorld>,
    range: DepthRange,
    model: UnprojectionModel,
) -> Result<Vec<Point3<f64>>, Error> {
    if distances.nrows() != rays.height() || distances.ncols() != rays.width() {
        return Err(Error::DimensionMismatch {
            map_width: distances.ncols(),
            map_height: distances.nrows(),
            table_width: rays.width(),
            table_height: rays.height(),
        });
    }
    let (rotation, translation) = match pose {
        Some(pose) => (pose.rotation(), pose.translation()),
        None => (Matrix3::identity(), Vector3::zeros()),
    };

    let mut points = Vec::new();
    for row in 0..distances.nrows() {
        for col in 0..distances.ncols() {
            let distance = distances[(row, col)];
            let (x, y) = rays.ray(row, col);
            if x.is_infinite() || y.is_infinite() || !range.contains(distance) {
                continue;
            }
            let (x, y) = (f64::from(x), f64::from(y));
            let point = match model {
                UnprojectionModel::DirectionDistance => {
                    let ray = Vector3::new(-x, -y, -1.0).normalize();
                    translation + distance * (rotation * ray)
                }
                UnprojectionModel::DepthAlongNormal => {
                    let depth = -distance / (x * x + y * y + 1.0).sqrt();
                    rotation * (Vector3::new(x, y, 1.0) * depth) + translation
                }
            };
            points.push(Point3::from(point));
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use rig_core::DepthThrow;

    fn straight_rays(width: usize, height: usize) -> RayTable {
        let bytes = vec![0u8; 2 * width * height * 4];
        RayTable::from_bytes(&bytes, width, height).unwrap()
    }

    fn map(rows: usize, cols: usize, values: &[f64]) -> DMatrix<f64> {
        DMatrix::from_row_slice(rows, cols, values)
    }

    #[test]
    fn reconstructs_straight_ahead_distances() {
        // Encoded samples 0x0100..0x0400 decode to 1..4 millimeters; with
        // all-zero rays every point lands on the optical axis.
        let distances = map(2, 2, &[0.001, 0.002, 0.003, 0.004]);
        let rays = straight_rays(2, 2);
        let range = DepthRange { min: 0.0001, max: 1.0 };

        let points = reconstruct_points(
            &distances,
            &rays,
            None,
            range,
            UnprojectionModel::DirectionDistance,
        )
        .unwrap();

        assert_eq!(points.len(), 4);
        for (point, expected) in points.iter().zip([0.001, 0.002, 0.003, 0.004]) {
            assert!((point.coords - Vector3::new(0.0, 0.0, -expected)).norm() < 1e-12);
        }
    }

    #[test]
    fn range_bounds_follow_the_throw_calibration() {
        let rays = straight_rays(3, 1);
        let distances = map(1, 3, &[0.02, 0.019, 3.001]);

        let points = reconstruct_points(
            &distances,
            &rays,
            None,
            DepthThrow::Short.depth_range(),
            UnprojectionModel::DirectionDistance,
        )
        .unwrap();

        // Only the exact lower bound survives.
        assert_eq!(points.len(), 1);
        assert!((points[0].coords.norm() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn infinite_rays_are_excluded() {
        let mut bytes = Vec::new();
        for (x, y) in [(f32::INFINITY, 0.0f32), (0.0f32, 0.0f32)] {
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
        }
        let rays = RayTable::from_bytes(&bytes, 2, 1).unwrap();
        let distances = map(1, 2, &[0.5, 0.5]);

        let points = reconstruct_points(
            &distances,
            &rays,
            None,
            DepthRange { min: 0.0, max: 1.0 },
            UnprojectionModel::DirectionDistance,
        )
        .unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn depth_along_normal_projects_to_the_axis() {
        let rays = straight_rays(1, 1);
        let distances = map(1, 1, &[0.75]);

        let points = reconstruct_points(
            &distances,
            &rays,
            None,
            DepthRange { min: 0.0, max: 1.0 },
            UnprojectionModel::DepthAlongNormal,
        )
        .unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].coords - Vector3::new(0.0, 0.0, -0.75)).norm() < 1e-12);
    }

    #[test]
    fn pose_places_points_in_the_world() {
        let rays = straight_rays(1, 1);
        let distances = map(1, 1, &[0.5]);
        let mut cam_to_world = Matrix4::identity();
        cam_to_world[(0, 3)] = 10.0;
        let pose = SensorToWorld(cam_to_world);

        let points = reconstruct_points(
            &distances,
            &rays,
            Some(&pose),
            DepthRange { min: 0.0, max: 1.0 },
            UnprojectionModel::DirectionDistance,
        )
        .unwrap();
        assert!((points[0].coords - Vector3::new(10.0, 0.0, -0.5)).norm() < 1e-12);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let rays = straight_rays(2, 2);
        let distances = map(1, 2, &[0.5, 0.5]);
        let result = reconstruct_points(
            &distances,
            &rays,
            None,
            DepthRange { min: 0.0, max: 1.0 },
            UnprojectionModel::DirectionDistance,
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
