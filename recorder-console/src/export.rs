use rig_core::rotation_to_quaternion;
use rig_sync::SynchronizedFrameSet;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the newline-separated relative frame names, grouped by
/// reference frame in timeline order, for the external reconstruction
/// tool's image list.
pub fn write_frame_list(path: &Path, sets: &[SynchronizedFrameSet]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for set in sets {
        for entry in &set.entries {
            writeln!(writer, "{}", entry.frame.name)?;
        }
    }
    Ok(())
}

/// Writes one exported pose record per synchronized frame:
/// `qw qx qy qz tx ty tz camera name`.
pub fn write_pose_records(path: &Path, sets: &[SynchronizedFrameSet]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for set in sets {
        for entry in &set.entries {
            let rotation = entry.pose.rotation();
            let translation = entry.pose.translation();
            let q = rotation_to_quaternion(&rotation);
            writeln!(
                writer,
                "{} {} {} {} {} {} {} {} {}",
                q.w,
                q.i,
                q.j,
                q.k,
                translation.x,
                translation.y,
                translation.z,
                entry.frame.camera,
                entry.frame.name
            )?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RigCameraConfig<'a> {
    camera: &'a str,
    image_prefix: &'a str,
}

#[derive(Serialize)]
struct RigConfig<'a> {
    ref_camera: &'a str,
    cameras: Vec<RigCameraConfig<'a>>,
}

/// Writes the rig layout consumed by the external tool's rig bundle
/// adjustment: the reference camera plus one image prefix per camera.
pub fn write_rig_config(
    path: &Path,
    ref_camera: &str,
    cameras: &[&str],
) -> Result<(), crate::Error> {
    let config = RigConfig {
        ref_camera,
        cameras: cameras
            .iter()
            .map(|&camera| RigCameraConfig {
                camera,
                image_prefix: camera,
            })
            .collect(),
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &config)?;
    Ok(())
}
