mod export;

use log::{debug, error, info, warn};
use rig_core::{
    read_pose_log, CameraConvention, DepthThrow, Timestamp, WorldToSensor,
    LONG_THROW_DEPTH_CAMERA, SHORT_THROW_DEPTH_CAMERA, TRACKING_CAMERAS,
};
use rig_depth::{
    decode_depth_image, read_depth_image, reconstruct_points, write_obj, write_ply,
    RayTableCache, UnprojectionModel,
};
use rig_sync::{list_camera_frames, read_sensor_frames, synchronize, SyncSettings};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use thiserror::Error;

#[derive(StructOpt, Clone)]
#[structopt(
    name = "recorder-console",
    about = "Synchronizes rig recordings and unprojects their depth frames for reconstruction"
)]
struct Opt {
    /// The downloaded recording folder to process.
    #[structopt(parse(from_os_str))]
    recording: PathBuf,
    /// The folder where output artifacts are written.
    ///
    /// Defaults to `<recording>/reconstruction`.
    #[structopt(short, long)]
    output: Option<PathBuf>,
    /// The file where synchronizer settings are specified.
    ///
    /// This is in the format of `rig_sync::SyncSettings`.
    #[structopt(short, long, default_value = "sync-settings.json")]
    settings: PathBuf,
    /// The camera whose timeline anchors the synchronized frame sets.
    #[structopt(long)]
    ref_camera: Option<String>,
    /// Target sampling rate for the reference timeline, in Hz.
    #[structopt(long)]
    frame_rate: Option<f64>,
    /// First resampled reference frame (or depth frame) to keep.
    #[structopt(long)]
    start_frame: Option<usize>,
    /// Maximum number of reference frames (or depth frames) to keep.
    #[structopt(long)]
    max_num_frames: Option<usize>,
    /// Skip the tracking-camera synchronization step.
    #[structopt(long)]
    skip_sync: bool,
    /// Unproject the short-throw depth folder.
    #[structopt(long)]
    short_throw: bool,
    /// Unproject the long-throw depth folder.
    #[structopt(long)]
    long_throw: bool,
    /// Drop sensor poses and keep point clouds in camera-local coordinates.
    #[structopt(long)]
    ignore_sensor_poses: bool,
    /// Treat decoded values as radial distances converted to axial depth
    /// instead of Euclidean distances along the ray.
    #[structopt(long)]
    depth_along_normal: bool,
    /// Accumulate all points and write one merged cloud per depth camera.
    #[structopt(long)]
    merge_points: bool,
    /// Rewrite output artifacts that already exist.
    #[structopt(long)]
    overwrite: bool,
    /// Suffix appended to per-frame point cloud file names.
    #[structopt(long, default_value = "")]
    output_suffix: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Pose(#[from] rig_core::Error),
    #[error(transparent)]
    Depth(#[from] rig_depth::Error),
    #[error(transparent)]
    Sync(#[from] rig_sync::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("reference camera {0:?} is not a rig tracking camera")]
    UnknownRefCamera(String),
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    if let Err(e) = run(&opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), Error> {
    let output = opt
        .output
        .clone()
        .unwrap_or_else(|| opt.recording.join("reconstruction"));
    std::fs::create_dir_all(&output)?;

    let settings = load_settings(opt);
    info!(
        "reference camera {} resampled to {} Hz",
        settings.ref_camera, settings.frame_rate
    );

    if !opt.skip_sync {
        synchronize_recording(opt, &settings, &output)?;
    }

    if opt.short_throw {
        process_depth_folder(opt, SHORT_THROW_DEPTH_CAMERA, &output)?;
    }
    if opt.long_throw {
        process_depth_folder(opt, LONG_THROW_DEPTH_CAMERA, &output)?;
    }
    Ok(())
}

/// Loads synchronizer settings from the settings file when it exists and
/// lets explicit command-line arguments override individual fields.
fn load_settings(opt: &Opt) -> SyncSettings {
    let settings = File::open(&opt.settings)
        .ok()
        .and_then(|file| serde_json::from_reader(file).ok());
    if settings.is_some() {
        info!("loaded settings from {}", opt.settings.display());
    } else {
        debug!("using default synchronizer settings");
    }
    let mut settings: SyncSettings = settings.unwrap_or_default();
    if let Some(ref_camera) = &opt.ref_camera {
        settings.ref_camera = ref_camera.clone();
    }
    if let Some(frame_rate) = opt.frame_rate {
        settings.frame_rate = frame_rate;
    }
    if let Some(start_frame) = opt.start_frame {
        settings.start_frame = start_frame;
    }
    if let Some(max_num_frames) = opt.max_num_frames {
        settings.max_num_frames = Some(max_num_frames);
    }
    settings
}

/// Synchronizes the tracking cameras and writes the frame list, exported
/// pose records, and rig configuration for the external tool.
fn synchronize_recording(opt: &Opt, settings: &SyncSettings, output: &Path) -> Result<(), Error> {
    if !TRACKING_CAMERAS.contains(&settings.ref_camera.as_str()) {
        return Err(Error::UnknownRefCamera(settings.ref_camera.clone()));
    }

    let mut reference = Vec::new();
    let mut others = Vec::new();
    for camera in TRACKING_CAMERAS {
        let poses = read_pose_log(
            opt.recording.join(format!("{}.csv", camera)),
            CameraConvention::Image,
        )?;
        let frames = read_sensor_frames(&opt.recording, camera, &poses)?;
        info!("{}: {} frames with accepted poses", camera, frames.len());
        if camera == settings.ref_camera {
            reference = frames;
        } else {
            others.push(frames);
        }
    }

    let sets = synchronize(&reference, &others, settings)?;
    info!("synchronized {} rig-complete frame sets", sets.len());

    let frame_list = output.join("image_list.txt");
    if should_write(&frame_list, opt.overwrite) {
        export::write_frame_list(&frame_list, &sets)?;
    }
    let pose_records = output.join("poses.txt");
    if should_write(&pose_records, opt.overwrite) {
        export::write_pose_records(&pose_records, &sets)?;
    }
    let rig_config = output.join("rig_config.json");
    if should_write(&rig_config, opt.overwrite) {
        export::write_rig_config(&rig_config, &settings.ref_camera, &TRACKING_CAMERAS)?;
    }
    Ok(())
}

/// Whether an artifact should be (re)written under the resume policy.
fn should_write(path: &Path, overwrite: bool) -> bool {
    if path.exists() && !overwrite {
        info!("skipping existing {}", path.display());
        false
    } else {
        true
    }
}

/// Unprojects every depth frame of one camera into a point cloud file,
/// resuming past frames whose artifact already exists.
fn process_depth_folder(opt: &Opt, camera: &str, output: &Path) -> Result<(), Error> {
    info!("processing depth folder {}", camera);
    let throw = DepthThrow::from_camera_name(camera);
    let model = if opt.depth_along_normal {
        UnprojectionModel::DepthAlongNormal
    } else {
        UnprojectionModel::DirectionDistance
    };

    let poses = if opt.ignore_sensor_poses {
        None
    } else {
        Some(read_pose_log(
            opt.recording.join(format!("{}.csv", camera)),
            CameraConvention::Native,
        )?)
    };

    let output_folder = output.join(camera);
    std::fs::create_dir_all(&output_folder)?;

    let frames = window_frames(
        list_camera_frames(&opt.recording, camera)?,
        opt.start_frame.unwrap_or(0),
        opt.max_num_frames,
    )?;

    let suffix = if opt.output_suffix.is_empty() {
        String::new()
    } else {
        format!("_{}", opt.output_suffix)
    };
    let mut rays = RayTableCache::new(
        opt.recording
            .join(format!("{}_camera_space_projection.bin", camera)),
    );
    let mut merged = Vec::new();

    let total = frames.len();
    for (index, frame) in frames.iter().enumerate() {
        if index % 10 == 0 {
            info!("progress: {}/{}", index + 1, total);
        }
        let cloud_path = output_folder.join(format!("{}{}.obj", frame.timestamp, suffix));
        if cloud_path.exists() && !opt.overwrite && !opt.merge_points {
            debug!("skipping existing {}", cloud_path.display());
            continue;
        }

        let pose = match lookup_pose(poses.as_ref(), frame.timestamp) {
            PoseLookup::Found(pose) => Some(pose),
            PoseLookup::NotTracked => {
                warn!(
                    "{}: no accepted pose at {}, skipping frame",
                    camera, frame.timestamp
                );
                continue;
            }
            PoseLookup::Ignored => None,
        };

        let image = read_depth_image(&frame.path)?;
        let (width, height) = image.dimensions();
        let table = rays.get_or_load(width as usize, height as usize)?;
        let distances = decode_depth_image(&image);
        let points = reconstruct_points(
            &distances,
            table,
            pose.as_ref(),
            throw.depth_range(),
            model,
        )?;

        if opt.merge_points {
            merged.extend_from_slice(&points);
        }
        if !cloud_path.exists() || opt.overwrite {
            let writer = BufWriter::new(File::create(&cloud_path)?);
            write_obj(writer, &points)?;
        }
    }

    if opt.merge_points {
        let merged_path = output.join(format!("{}.ply", camera));
        info!(
            "writing {} merged points to {}",
            merged.len(),
            merged_path.display()
        );
        let writer = BufWriter::new(File::create(&merged_path)?);
        write_ply(writer, &merged, None)?;
    }
    Ok(())
}

enum PoseLookup {
    Found(rig_core::SensorToWorld),
    NotTracked,
    Ignored,
}

/// Resolves the camera-to-world pose for one depth frame. A timestamp
/// missing from the pose map means the tracker had no fix there; the
/// frame is skipped rather than silently mixed into world-space output.
fn lookup_pose(
    poses: Option<&BTreeMap<Timestamp, WorldToSensor>>,
    timestamp: Timestamp,
) -> PoseLookup {
    match poses {
        None => PoseLookup::Ignored,
        Some(poses) => match poses.get(&timestamp) {
            Some(pose) => PoseLookup::Found(pose.inverse()),
            None => PoseLookup::NotTracked,
        },
    }
}

/// Applies the start/count window to a depth frame list with the same
/// contract as the synchronizer: a start index past the end is fatal.
fn window_frames<T>(
    frames: Vec<T>,
    start_frame: usize,
    max_num_frames: Option<usize>,
) -> Result<Vec<T>, Error> {
    match max_num_frames {
        None => Ok(frames),
        Some(max_num_frames) => {
            if start_frame >= frames.len() {
                return Err(Error::Sync(rig_sync::Error::StartFrameOutOfRange {
                    start: start_frame,
                    available: frames.len(),
                }));
            }
            let end = frames.len().min(start_frame + max_num_frames);
            Ok(frames
                .into_iter()
                .skip(start_frame)
                .take(end - start_frame)
                .collect())
        }
    }
}
