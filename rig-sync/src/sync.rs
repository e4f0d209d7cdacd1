use crate::{Error, SensorFrame};
use itertools::Itertools;
use log::info;
use rig_core::{Timestamp, WorldToSensor, NATIVE_FRAME_RATE, TIME_PER_FRAME};
use serde::{Deserialize, Serialize};

/// Settings for the frame synchronizer.
///
/// Loaded from JSON by the console with defaults filling absent fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// The camera whose timeline anchors the synchronized sets.
    #[serde(default = "default_ref_camera")]
    pub ref_camera: String,
    /// Target sampling rate of the reference timeline, in Hz.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// First resampled reference frame to keep.
    #[serde(default)]
    pub start_frame: usize,
    /// Maximum number of reference frames to keep; `None` keeps all.
    #[serde(default)]
    pub max_num_frames: Option<usize>,
}

fn default_ref_camera() -> String {
    "vlc_ll".to_string()
}

fn default_frame_rate() -> f64 {
    5.0
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            ref_camera: default_ref_camera(),
            frame_rate: default_frame_rate(),
            start_frame: 0,
            max_num_frames: None,
        }
    }
}

impl SyncSettings {
    /// Minimum tick gap between two kept reference timestamps.
    pub fn time_per_frame_sampled(&self) -> f64 {
        NATIVE_FRAME_RATE / self.frame_rate * TIME_PER_FRAME
    }
}

/// One camera's contribution to a synchronized frame set.
#[derive(Debug, Clone)]
pub struct SyncEntry {
    pub frame: SensorFrame,
    pub pose: WorldToSensor,
}

/// Frames of every rig camera anchored to one reference timestamp.
///
/// Emitted only when the whole rig contributed, so `entries` always holds
/// exactly one entry per camera: the reference camera first, the others
/// in the order they were supplied.
#[derive(Debug, Clone)]
pub struct SynchronizedFrameSet {
    pub reference_timestamp: Timestamp,
    pub entries: Vec<SyncEntry>,
}

/// Greedily resamples a sorted timestamp sequence down to a minimum gap.
///
/// The first timestamp is always kept; a later one survives only when it
/// lies at least `min_gap` ticks after the last kept timestamp. The scan
/// tolerates irregular native timestamps, unlike a fixed-stride sample.
/// Returns indices into `timestamps`.
pub fn resample_timeline(timestamps: &[Timestamp], min_gap: f64) -> Vec<usize> {
    let mut kept = Vec::new();
    let mut last_kept = None;
    for (index, &timestamp) in timestamps.iter().enumerate() {
        let keep = match last_kept {
            None => true,
            Some(last) => (timestamp.saturating_sub(last)) as f64 >= min_gap,
        };
        if keep {
            kept.push(index);
            last_kept = Some(timestamp);
        }
    }
    kept
}

/// Matches every camera's frames against the reference timeline and
/// returns the rig-complete frame sets in timeline order.
///
/// The reference frames must be sorted by timestamp (frame discovery
/// guarantees this). Matching is two-pass: the first pass assigns each
/// non-reference frame to the nearest resampled reference timestamp,
/// accepting it only when the difference is strictly below a fifth of the
/// native frame period and keeping at most the nearest frame per camera;
/// the second pass drops every reference instant that did not reach full
/// rig coverage. Partial coverage is expected and silently discarded.
pub fn synchronize(
    reference: &[(SensorFrame, WorldToSensor)],
    others: &[Vec<(SensorFrame, WorldToSensor)>],
    settings: &SyncSettings,
) -> Result<Vec<SynchronizedFrameSet>, Error> {
    let timestamps: Vec<Timestamp> = reference
        .iter()
        .map(|(frame, _)| frame.timestamp)
        .collect();
    let mut kept = resample_timeline(&timestamps, settings.time_per_frame_sampled());

    if let Some(max_num_frames) = settings.max_num_frames {
        if settings.start_frame >= kept.len() {
            return Err(Error::StartFrameOutOfRange {
                start: settings.start_frame,
                available: kept.len(),
            });
        }
        let end = kept.len().min(settings.start_frame + max_num_frames);
        kept = kept[settings.start_frame..end].to_vec();
    }

    let reference_times: Vec<Timestamp> = kept.iter().map(|&index| timestamps[index]).collect();

    // Pass 1: nearest-timestamp assignment. Ties between two reference
    // instants resolve to the first by index, and within one
    // (reference, camera) cell the nearest frame wins, first on ties.
    let max_sync_diff = TIME_PER_FRAME / 5.0;
    let mut matches: Vec<Vec<Option<(u64, usize)>>> =
        vec![vec![None; others.len()]; reference_times.len()];
    for (camera_index, frames) in others.iter().enumerate() {
        for (frame_index, (frame, _)) in frames.iter().enumerate() {
            let nearest = reference_times
                .iter()
                .position_min_by_key(|&&reference| reference.abs_diff(frame.timestamp));
            if let Some(reference_index) = nearest {
                let diff = reference_times[reference_index].abs_diff(frame.timestamp);
                if (diff as f64) < max_sync_diff {
                    let cell = &mut matches[reference_index][camera_index];
                    if cell.map_or(true, |(best, _)| diff < best) {
                        *cell = Some((diff, frame_index));
                    }
                }
            }
        }
    }

    // Pass 2: quorum. A set is emitted only with the full rig on board.
    let mut sets = Vec::new();
    for (slot, &index) in kept.iter().enumerate() {
        let cells = &matches[slot];
        if cells.iter().any(Option::is_none) {
            continue;
        }
        let (frame, pose) = &reference[index];
        let mut entries = Vec::with_capacity(1 + others.len());
        entries.push(SyncEntry {
            frame: frame.clone(),
            pose: *pose,
        });
        for (camera_index, cell) in cells.iter().enumerate() {
            if let Some((_, frame_index)) = cell {
                let (frame, pose) = &others[camera_index][*frame_index];
                entries.push(SyncEntry {
                    frame: frame.clone(),
                    pose: *pose,
                });
            }
        }
        sets.push(SynchronizedFrameSet {
            reference_timestamp: frame.timestamp,
            entries,
        });
    }
    info!(
        "{} of {} resampled reference frames reached full rig coverage",
        sets.len(),
        reference_times.len()
    );
    Ok(sets)
}
