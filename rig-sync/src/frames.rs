use crate::Error;
use log::warn;
use rig_core::{Timestamp, WorldToSensor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One discovered image file of one camera.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    /// Camera (folder) name the frame belongs to.
    pub camera: String,
    /// Relative `camera/<timestamp>.pgm` name with forward slashes, the
    /// form downstream frame lists use.
    pub name: String,
    /// Absolute path of the image file.
    pub path: PathBuf,
    /// Capture instant parsed from the file stem.
    pub timestamp: Timestamp,
}

/// Lists one camera's frames sorted by timestamp.
///
/// Files whose stem is not an integer timestamp are skipped with a
/// warning; a missing camera folder is fatal for that camera.
pub fn list_camera_frames(recording_path: &Path, camera: &str) -> Result<Vec<SensorFrame>, Error> {
    let folder = recording_path.join(camera);
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(&folder)? {
        let path = entry?.path();
        if path.extension().map_or(true, |extension| extension != "pgm") {
            continue;
        }
        let stem = path.file_stem().and_then(|stem| stem.to_str());
        let timestamp: Timestamp = match stem.and_then(|stem| stem.parse().ok()) {
            Some(timestamp) => timestamp,
            None => {
                warn!("skipping frame with non-numeric name: {}", path.display());
                continue;
            }
        };
        frames.push(SensorFrame {
            camera: camera.to_owned(),
            name: format!("{}/{}.pgm", camera, timestamp),
            path,
            timestamp,
        });
    }
    frames.sort_by_key(|frame| frame.timestamp);
    Ok(frames)
}

/// Discovers one camera's frames and pairs them with their poses.
///
/// Frames whose timestamp is absent from the pose map are dropped: a
/// missing entry means the tracker had no usable pose at that instant,
/// not that anything went wrong.
pub fn read_sensor_frames(
    recording_path: &Path,
    camera: &str,
    poses: &BTreeMap<Timestamp, WorldToSensor>,
) -> Result<Vec<(SensorFrame, WorldToSensor)>, Error> {
    let frames = list_camera_frames(recording_path, camera)?;
    let total = frames.len();
    let paired: Vec<(SensorFrame, WorldToSensor)> = frames
        .into_iter()
        .filter_map(|frame| poses.get(&frame.timestamp).map(|&pose| (frame, pose)))
        .collect();
    if paired.len() < total {
        warn!(
            "{}: {} of {} frames have no accepted pose",
            camera,
            total - paired.len(),
            total
        );
    }
    Ok(paired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::nalgebra::Matrix4;
    use std::fs::File;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn lists_frames_sorted_and_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let camera_dir = dir.path().join("vlc_ll");
        std::fs::create_dir(&camera_dir).unwrap();
        touch(&camera_dir.join("200.pgm"));
        touch(&camera_dir.join("100.pgm"));
        touch(&camera_dir.join("notes.txt"));
        touch(&camera_dir.join("broken.pgm"));

        let frames = list_camera_frames(dir.path(), "vlc_ll").unwrap();
        let timestamps: Vec<Timestamp> = frames.iter().map(|frame| frame.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200]);
        assert_eq!(frames[0].name, "vlc_ll/100.pgm");
    }

    #[test]
    fn missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_camera_frames(dir.path(), "vlc_ll"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn frames_without_poses_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let camera_dir = dir.path().join("vlc_rf");
        std::fs::create_dir(&camera_dir).unwrap();
        touch(&camera_dir.join("1.pgm"));
        touch(&camera_dir.join("2.pgm"));

        let mut poses = BTreeMap::new();
        poses.insert(2, WorldToSensor(Matrix4::identity()));

        let paired = read_sensor_frames(dir.path(), "vlc_rf", &poses).unwrap();
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].0.timestamp, 2);
    }
}
