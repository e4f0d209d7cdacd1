use derive_more::{AsRef, From, Into};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Absolute pose of one sensor at one instant, mapping world coordinates
/// into that sensor's coordinate system.
///
/// The rotation block of an accepted pose is orthonormal up to tracking
/// drift; poses whose rotation fails the determinant gate never make it
/// into a pose map (see [`read_pose_log`](crate::read_pose_log)).
#[derive(Debug, Clone, Copy, PartialEq, AsRef, From, Into)]
pub struct WorldToSensor(pub Matrix4<f64>);

/// The inverse mapping of [`WorldToSensor`], placing sensor-local
/// coordinates (and therefore reconstructed points) in the world.
#[derive(Debug, Clone, Copy, PartialEq, AsRef, From, Into)]
pub struct SensorToWorld(pub Matrix4<f64>);

impl WorldToSensor {
    /// The rotation block of the transform.
    pub fn rotation(&self) -> Matrix3<f64> {
        rotation_block(&self.0)
    }

    /// The translation column of the transform.
    pub fn translation(&self) -> Vector3<f64> {
        translation_block(&self.0)
    }

    /// The full homogeneous matrix.
    pub fn homogeneous(&self) -> Matrix4<f64> {
        self.0
    }

    /// Inverts the pose using its rigid structure.
    pub fn inverse(&self) -> SensorToWorld {
        SensorToWorld(rigid_inverse(&self.0))
    }
}

impl SensorToWorld {
    /// The rotation block of the transform.
    pub fn rotation(&self) -> Matrix3<f64> {
        rotation_block(&self.0)
    }

    /// The translation column of the transform.
    pub fn translation(&self) -> Vector3<f64> {
        translation_block(&self.0)
    }

    /// The full homogeneous matrix.
    pub fn homogeneous(&self) -> Matrix4<f64> {
        self.0
    }

    /// Inverts the pose using its rigid structure.
    pub fn inverse(&self) -> WorldToSensor {
        WorldToSensor(rigid_inverse(&self.0))
    }
}

fn rotation_block(m: &Matrix4<f64>) -> Matrix3<f64> {
    m.fixed_slice::<3, 3>(0, 0).into_owned()
}

fn translation_block(m: &Matrix4<f64>) -> Vector3<f64> {
    m.fixed_slice::<3, 1>(0, 3).into_owned()
}

/// Inverse of a rigid homogeneous transform, computed blockwise as
/// `[Rᵀ | -Rᵀt]` so it stays exact for gated poses and cannot fail.
fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let rotation = rotation_block(m).transpose();
    let translation = -rotation * translation_block(m);
    let mut inverse = Matrix4::identity();
    inverse.fixed_slice_mut::<3, 3>(0, 0).copy_from(&rotation);
    inverse.fixed_slice_mut::<3, 1>(0, 3).copy_from(&translation);
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Vector3};

    fn sample_pose() -> WorldToSensor {
        let rotation = Rotation3::from_euler_angles(0.3, -0.8, 1.4);
        let mut m = Matrix4::identity();
        m.fixed_slice_mut::<3, 3>(0, 0).copy_from(rotation.matrix());
        m.fixed_slice_mut::<3, 1>(0, 3)
            .copy_from(&Vector3::new(0.5, -2.0, 3.25));
        WorldToSensor(m)
    }

    #[test]
    fn rigid_inverse_roundtrips() {
        let pose = sample_pose();
        let roundtrip = pose.inverse().inverse();
        let error = (roundtrip.0 - pose.0).abs().max();
        assert!(error < 1e-12, "roundtrip error {}", error);
    }

    #[test]
    fn inverse_composes_to_identity() {
        let pose = sample_pose();
        let product = pose.homogeneous() * pose.inverse().homogeneous();
        let error = (product - Matrix4::identity()).abs().max();
        assert!(error < 1e-12, "composition error {}", error);
    }
}
