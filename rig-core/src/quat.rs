use float_ord::FloatOrd;
use nalgebra::{Matrix3, Matrix4, Quaternion, UnitQuaternion};

/// Converts a rotation matrix to a unit quaternion through the
/// eigen-decomposition of the Shuster/Markley matrix.
///
/// Tracked rotations are orthonormal only up to drift, which makes the
/// naive trace-based formula unstable near its branch points; the largest
/// eigenvector of the symmetric 4x4 profile matrix is well conditioned for
/// all inputs close to a rotation. The caller is responsible for passing
/// something near-orthonormal; this function does not re-validate.
///
/// The returned quaternion always has a non-negative scalar component.
pub fn rotation_to_quaternion(rotation: &Matrix3<f64>) -> UnitQuaternion<f64> {
    let m = rotation;
    #[rustfmt::skip]
    let k = Matrix4::new(
        m[(0, 0)] - m[(1, 1)] - m[(2, 2)], m[(0, 1)] + m[(1, 0)], m[(0, 2)] + m[(2, 0)], m[(2, 1)] - m[(1, 2)],
        m[(0, 1)] + m[(1, 0)], m[(1, 1)] - m[(0, 0)] - m[(2, 2)], m[(1, 2)] + m[(2, 1)], m[(0, 2)] - m[(2, 0)],
        m[(0, 2)] + m[(2, 0)], m[(1, 2)] + m[(2, 1)], m[(2, 2)] - m[(0, 0)] - m[(1, 1)], m[(1, 0)] - m[(0, 1)],
        m[(2, 1)] - m[(1, 2)], m[(0, 2)] - m[(2, 0)], m[(1, 0)] - m[(0, 1)], m[(0, 0)] + m[(1, 1)] + m[(2, 2)],
    ) / 3.0;

    let eigen = k.symmetric_eigen();
    let largest = (0..4)
        .max_by_key(|&i| FloatOrd(eigen.eigenvalues[i]))
        .unwrap_or(3);
    let v = eigen.eigenvectors.column(largest);

    // The eigenvector basis orders the vector part before the scalar.
    let mut quaternion = Quaternion::new(v[3], v[0], v[1], v[2]);
    if quaternion.w < 0.0 {
        quaternion = -quaternion;
    }
    UnitQuaternion::from_quaternion(quaternion)
}
