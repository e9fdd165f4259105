//! Analysis types shared across the detection passes

use crate::chart::Voice;
use crate::config::ThresholdConfig;
use crate::groove::GrooveModel;
use crate::tempo::TempoMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Numeric descriptors of one analysis window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Notes per beat within the window
    pub note_density: f64,
    /// Density z-score against the rolling baseline
    pub density_z: f64,
    /// Fraction of window notes on tom voices
    pub tom_fraction: f64,
    /// Tom fraction relative to the rolling tom baseline
    pub tom_ratio_jump: f64,
    /// Fractional drop in hat/ride presence vs. the rolling baseline
    pub hat_dropout: f64,
    /// Fractional drop in kick presence vs. the rolling baseline
    pub kick_drop: f64,
    /// Z-score of the inter-onset-interval standard deviation
    pub ioi_std_z: f64,
    /// Share of the window's rhythmic n-grams never seen before
    pub ngram_novelty: f64,
    /// Mahalanobis distance from the groove baseline (0 when model invalid)
    pub groove_dist: f64,
    /// At least 3 same-voice hits in rapid succession
    pub same_pad_burst: bool,
    /// A crash lands right after a high-density run
    pub crash_resolve: bool,
}

impl FeatureVector {
    /// Dimensionality of the groove-model training vector
    pub const GROOVE_DIMS: usize = 7;

    /// Continuous coordinates fed to the groove model (excludes `groove_dist`)
    pub fn groove_coords(&self) -> [f64; Self::GROOVE_DIMS] {
        [
            self.note_density,
            self.density_z,
            self.tom_ratio_jump,
            self.hat_dropout,
            self.kick_drop,
            self.ioi_std_z,
            self.ngram_novelty,
        ]
    }
}

/// A drum hit after flattening: tick plus cached ms times and resolved voice
#[derive(Debug, Clone, Copy)]
pub struct ChartNote {
    pub tick: u64,
    pub ms_time: f64,
    pub length: u64,
    pub ms_length: f64,
    pub voice: Voice,
}

/// A beat-aligned slice of the timeline under analysis
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    pub start_tick: u64,
    pub end_tick: u64,
    /// Index range into the state's note arena for notes in `[start, end)`
    pub note_range: Range<usize>,
    pub features: FeatureVector,
    pub is_candidate: bool,
    /// Rule confidence in [0, 1], used only for diagnostics and tie-breaking
    pub confidence: f64,
}

/// A detected fill with tick and millisecond bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillSegment {
    pub song_id: String,
    pub start_tick: u64,
    pub end_tick: u64,
    pub start_ms: f64,
    pub end_ms: f64,
    /// Features aggregated across the segment's windows (mean / logical OR)
    pub features: FeatureVector,
}

/// Pipeline state threaded through the passes
#[derive(Debug, Clone)]
pub struct FillState {
    pub song_id: String,
    /// Ticks per quarter note
    pub resolution: u32,
    pub tempo_map: TempoMap,
    /// All drum notes of the selected track, sorted by tick
    pub notes: Vec<ChartNote>,
    pub windows: Vec<AnalysisWindow>,
    pub groove: Option<GrooveModel>,
    pub segments: Vec<FillSegment>,
}

impl FillState {
    /// Create the initial state from flattened, tick-sorted notes
    pub fn new(song_id: String, tempo_map: TempoMap, notes: Vec<ChartNote>) -> Self {
        FillState {
            song_id,
            resolution: tempo_map.resolution(),
            tempo_map,
            notes,
            windows: Vec::new(),
            groove: None,
            segments: Vec::new(),
        }
    }

    /// Notes falling inside the given window
    pub fn window_notes(&self, window: &AnalysisWindow) -> &[ChartNote] {
        &self.notes[window.note_range.clone()]
    }
}

/// Post-hoc diagnostic checks on a segment list.
///
/// Returns one message per violated invariant. Intended for tests and
/// debugging; `FillDetector::detect` never calls this itself.
pub fn validate_fill_segments(
    segments: &[FillSegment],
    resolution: u32,
    thresholds: &ThresholdConfig,
) -> Vec<String> {
    let mut issues = Vec::new();

    for (i, seg) in segments.iter().enumerate() {
        if seg.start_tick >= seg.end_tick {
            issues.push(format!(
                "segment {}: inverted tick bounds {}..{}",
                i, seg.start_tick, seg.end_tick
            ));
        }
        if seg.start_ms < 0.0 || seg.start_ms >= seg.end_ms {
            issues.push(format!(
                "segment {}: invalid ms bounds {:.3}..{:.3}",
                i, seg.start_ms, seg.end_ms
            ));
        }

        let beats = (seg.end_tick.saturating_sub(seg.start_tick)) as f64 / resolution as f64;
        if beats < thresholds.min_beats || beats > thresholds.max_beats {
            issues.push(format!(
                "segment {}: duration {:.2} beats outside [{}, {}]",
                i, beats, thresholds.min_beats, thresholds.max_beats
            ));
        }

        let f = &seg.features;
        let continuous = [
            f.note_density,
            f.density_z,
            f.tom_fraction,
            f.tom_ratio_jump,
            f.hat_dropout,
            f.kick_drop,
            f.ioi_std_z,
            f.ngram_novelty,
            f.groove_dist,
        ];
        if continuous.iter().any(|v| !v.is_finite()) {
            issues.push(format!("segment {}: non-finite feature value", i));
        }
        if f.groove_dist < 0.0 {
            issues.push(format!("segment {}: negative groove distance", i));
        }

        if i > 0 {
            let prev = &segments[i - 1];
            if prev.song_id == seg.song_id && seg.start_tick < prev.start_tick {
                issues.push(format!("segment {}: not sorted by start_tick", i));
            }
            if prev.song_id == seg.song_id
                && prev.start_tick < seg.end_tick
                && seg.start_tick < prev.end_tick
            {
                issues.push(format!("segments {} and {}: overlapping", i - 1, i));
            }
        }
    }

    issues
}
