use crate::{Error, Timestamp, WorldToSensor};
use log::{debug, warn};
use nalgebra::{Matrix4, Vector4};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of comma-separated fields in one pose-log record: timestamp, a
/// reserved field, two row-major 4x4 transforms, and trailing fields this
/// reader does not consume.
const RECORD_FIELDS: usize = 50;

/// Tolerance on `|det(R) - 1|` within which a tracked rotation block
/// counts as a proper rotation.
const ROTATION_DET_TOLERANCE: f64 = 0.01;

/// Coordinate convention of the returned sensor poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraConvention {
    /// Poses map world coordinates into the recorder's native camera
    /// space.
    Native,
    /// Poses additionally apply the fixed axis flip into image
    /// conventions (+y down, +z away from the scene).
    Image,
}

impl CameraConvention {
    /// The camera-to-image transform selected by this convention.
    ///
    /// The flip `diag(1, -1, -1, 1)` is a calibration constant of the
    /// documented device family; it does not transfer to other recorders.
    fn camera_to_image(self) -> Matrix4<f64> {
        match self {
            Self::Native => Matrix4::identity(),
            Self::Image => Matrix4::from_diagonal(&Vector4::new(1.0, -1.0, -1.0, 1.0)),
        }
    }
}

/// Reads one camera's pose log into a map from timestamp to accepted
/// absolute pose.
///
/// Each record carries two relative transforms: the rig pose in the
/// session origin (`frame_to_origin`) and the camera extrinsics relative
/// to the rig (`camera_to_frame`). The absolute pose is composed as
/// `camera_to_image * camera_to_frame * frame_to_origin^-1`.
///
/// Records whose `frame_to_origin` rotation block is not numerically a
/// proper rotation are tracking losses and are dropped, as are records
/// that fail to parse. A timestamp absent from the returned map therefore
/// means "no pose available at that instant", never an error.
pub fn read_pose_log(
    path: impl AsRef<Path>,
    convention: CameraConvention,
) -> Result<BTreeMap<Timestamp, WorldToSensor>, Error> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_pose_log(BufReader::new(file), convention)
}

/// Parses a pose log from any buffered reader. See [`read_pose_log`].
pub fn parse_pose_log(
    reader: impl BufRead,
    convention: CameraConvention,
) -> Result<BTreeMap<Timestamp, WorldToSensor>, Error> {
    let camera_to_image = convention.camera_to_image();
    let mut poses = BTreeMap::new();
    // The first line is the column header.
    for line in reader.lines().skip(1) {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (timestamp, frame_to_origin, camera_to_frame) = match parse_record(line) {
            Some(record) => record,
            None => {
                warn!("skipping malformed pose record: {:.60}", line);
                continue;
            }
        };
        // Frames where the tracker lost its fix carry a degenerate
        // rotation; they must not poison downstream reconstruction.
        let det = frame_to_origin.fixed_slice::<3, 3>(0, 0).determinant();
        if (det - 1.0).abs() >= ROTATION_DET_TOLERANCE {
            debug!(
                "dropping pose at {} with rotation determinant {}",
                timestamp, det
            );
            continue;
        }
        let origin_to_frame = match frame_to_origin.try_inverse() {
            Some(inverse) => inverse,
            None => {
                debug!("dropping pose at {}: singular frame_to_origin", timestamp);
                continue;
            }
        };
        let pose = camera_to_image * camera_to_frame * origin_to_frame;
        poses.insert(timestamp, WorldToSensor(pose));
    }
    Ok(poses)
}

/// Splits one record into its timestamp and the two 4x4 transforms.
///
/// Both transforms are stored row-major and transposed relative to
/// column-major homogeneous convention, so they are read row-major and
/// transposed before use.
fn parse_record(line: &str) -> Option<(Timestamp, Matrix4<f64>, Matrix4<f64>)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != RECORD_FIELDS {
        return None;
    }
    let timestamp: Timestamp = fields[0].trim().parse().ok()?;
    let frame_to_origin = parse_transform(&fields[2..18])?;
    let camera_to_frame = parse_transform(&fields[18..34])?;
    Some((timestamp, frame_to_origin, camera_to_frame))
}

fn parse_transform(fields: &[&str]) -> Option<Matrix4<f64>> {
    let mut values = [0.0; 16];
    for (value, field) in values.iter_mut().zip(fields) {
        *value = field.trim().parse().ok()?;
    }
    Some(Matrix4::from_row_slice(&values).transpose())
}
