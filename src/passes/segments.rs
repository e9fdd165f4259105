//! Segment merger: group candidate windows into final fill segments

use crate::analysis::{ChartNote, FeatureVector, FillSegment, FillState};
use crate::config::Config;
use crate::error::Result;

/// A run of candidate windows, by window index
#[derive(Debug, Clone, Copy)]
struct Provisional {
    first: usize,
    last: usize,
}

/// Turn the candidate-window stream into sorted, non-overlapping segments:
/// group, merge nearby groups, filter by duration, aggregate features,
/// refine boundaries, convert to ms, and resolve any remaining overlaps.
pub fn run(state: &mut FillState, config: &Config) -> Result<()> {
    let t = &config.thresholds;
    let resolution = state.resolution as f64;
    let merge_gap_ticks = (t.merge_gap_beats * resolution).round() as i64;

    let groups = merge_groups(group_candidates(state), state, merge_gap_ticks);

    let mut segments = Vec::new();
    for group in groups {
        let start_tick = state.windows[group.first].start_tick;
        let end_tick = state.windows[group.last].end_tick;

        let beats = (end_tick - start_tick) as f64 / resolution;
        if beats < t.min_beats || beats > t.max_beats {
            continue;
        }

        let features = aggregate_features(
            state.windows[group.first..=group.last]
                .iter()
                .map(|w| &w.features),
        );

        let note_span = state.windows[group.first].note_range.start
            ..state.windows[group.last].note_range.end;
        let (refined_start, refined_end) = refine_bounds(
            &state.notes[note_span],
            start_tick,
            end_tick,
            state.resolution,
        );

        // Tightening can push the duration back outside the configured
        // bounds; the window bounds already passed the filter, keep them then
        let refined_beats = (refined_end - refined_start) as f64 / resolution;
        let (start_tick, end_tick) = if refined_beats < t.min_beats || refined_beats > t.max_beats
        {
            (start_tick, end_tick)
        } else {
            (refined_start, refined_end)
        };
        let (start_ms, end_ms) = state.tempo_map.tick_range_to_ms(start_tick, end_tick);

        segments.push(FillSegment {
            song_id: state.song_id.clone(),
            start_tick,
            end_tick,
            start_ms,
            end_ms,
            features,
        });
    }

    state.segments = resolve_overlaps(segments);
    log::debug!("{} fill segments after merging", state.segments.len());
    Ok(())
}

/// Collect runs of strictly consecutive candidate windows
fn group_candidates(state: &FillState) -> Vec<Provisional> {
    let mut groups = Vec::new();
    let n = state.windows.len();
    let mut i = 0usize;
    while i < n {
        if !state.windows[i].is_candidate {
            i += 1;
            continue;
        }
        let first = i;
        while i < n && state.windows[i].is_candidate {
            i += 1;
        }
        groups.push(Provisional {
            first,
            last: i - 1,
        });
    }
    groups
}

/// Merge provisional groups separated by at most `merge_gap_ticks`
fn merge_groups(
    groups: Vec<Provisional>,
    state: &FillState,
    merge_gap_ticks: i64,
) -> Vec<Provisional> {
    let mut merged: Vec<Provisional> = Vec::with_capacity(groups.len());
    for group in groups {
        if let Some(prev) = merged.last_mut() {
            let gap = state.windows[group.first].start_tick as i64
                - state.windows[prev.last].end_tick as i64;
            if gap <= merge_gap_ticks {
                prev.last = group.last;
                continue;
            }
        }
        merged.push(group);
    }
    merged
}

/// Aggregate features across a segment's windows: continuous fields use the
/// mean, boolean flags use logical OR
fn aggregate_features<'a>(windows: impl Iterator<Item = &'a FeatureVector>) -> FeatureVector {
    let mut agg = FeatureVector::default();
    let mut count = 0usize;
    for f in windows {
        agg.note_density += f.note_density;
        agg.density_z += f.density_z;
        agg.tom_fraction += f.tom_fraction;
        agg.tom_ratio_jump += f.tom_ratio_jump;
        agg.hat_dropout += f.hat_dropout;
        agg.kick_drop += f.kick_drop;
        agg.ioi_std_z += f.ioi_std_z;
        agg.ngram_novelty += f.ngram_novelty;
        agg.groove_dist += f.groove_dist;
        agg.same_pad_burst |= f.same_pad_burst;
        agg.crash_resolve |= f.crash_resolve;
        count += 1;
    }
    if count > 0 {
        let n = count as f64;
        agg.note_density /= n;
        agg.density_z /= n;
        agg.tom_fraction /= n;
        agg.tom_ratio_jump /= n;
        agg.hat_dropout /= n;
        agg.kick_drop /= n;
        agg.ioi_std_z /= n;
        agg.ngram_novelty /= n;
        agg.groove_dist /= n;
    }
    agg
}

/// Round a tick to the nearest whole-beat multiple of the resolution
pub fn snap_to_beat(tick: u64, resolution: u32) -> u64 {
    let res = resolution as f64;
    ((tick as f64 / res).round() * res) as u64
}

/// Tighten segment bounds to the burst evidence, then snap to whole beats.
///
/// Window bounds land on the stride grid, which can put a segment's start a
/// beat before the fill actually begins. The start advances to the first note
/// opening a run of at least 3 hits at eighth-note-or-tighter spacing; the
/// end pulls back to the last such note plus one inter-onset gap. Without any
/// qualifying run the window bounds stand.
pub fn refine_bounds(
    notes: &[ChartNote],
    start_tick: u64,
    end_tick: u64,
    resolution: u32,
) -> (u64, u64) {
    let run_gap = (resolution as u64 / 2).max(1);

    let mut refined_start = None;
    for i in 0..notes.len().saturating_sub(2) {
        let g1 = notes[i + 1].tick - notes[i].tick;
        let g2 = notes[i + 2].tick - notes[i + 1].tick;
        if g1 <= run_gap && g2 <= run_gap {
            refined_start = Some(notes[i].tick);
            break;
        }
    }

    let mut refined_end = None;
    for j in (2..notes.len()).rev() {
        let g1 = notes[j - 1].tick - notes[j - 2].tick;
        let g2 = notes[j].tick - notes[j - 1].tick;
        if g1 <= run_gap && g2 <= run_gap {
            refined_end = Some((notes[j].tick + g2).min(end_tick));
            break;
        }
    }

    let (tight_start, tight_end) = match (refined_start, refined_end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => (start_tick, end_tick),
    };

    let snapped_start = snap_to_beat(tight_start, resolution);
    let mut snapped_end = snap_to_beat(tight_end, resolution);
    if snapped_end <= snapped_start {
        snapped_end = snapped_start + resolution as u64;
    }
    (snapped_start, snapped_end)
}

/// Sort by `(song_id, start_tick)` and drop the less confident of any two
/// segments still overlapping after refinement.
///
/// Higher aggregated groove distance wins; ties keep the earlier segment.
/// The loser is dropped entirely, never trimmed.
pub fn resolve_overlaps(mut segments: Vec<FillSegment>) -> Vec<FillSegment> {
    segments.sort_by(|a, b| {
        a.song_id
            .cmp(&b.song_id)
            .then(a.start_tick.cmp(&b.start_tick))
    });

    let mut kept: Vec<FillSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(prev) = kept.last() {
            if prev.song_id == segment.song_id && segment.start_tick < prev.end_tick {
                if segment.features.groove_dist > prev.features.groove_dist {
                    kept.pop();
                    kept.push(segment);
                }
                continue;
            }
        }
        kept.push(segment);
    }
    kept
}
