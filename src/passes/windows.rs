//! Window builder: slice the note stream into overlapping beat-length windows

use crate::analysis::{AnalysisWindow, FeatureVector, FillState};
use crate::config::Config;
use crate::error::Result;

/// Build overlapping analysis windows covering the note span.
///
/// Windows start at the first note's tick, span `window_beats` and advance by
/// `stride_beats`. The final window may overhang the last note. Fewer than
/// two notes cannot form a bounded window, so none are produced.
pub fn run(state: &mut FillState, config: &Config) -> Result<()> {
    state.windows.clear();
    if state.notes.len() < 2 {
        return Ok(());
    }

    let resolution = state.resolution as f64;
    let window_ticks = ((config.window_beats * resolution).round() as u64).max(1);
    let stride_ticks = ((config.stride_beats * resolution).round() as u64).max(1);

    let first_tick = state.notes[0].tick;
    let last_tick = state.notes[state.notes.len() - 1].tick;

    let mut note_cursor = 0usize;
    let mut window_start = first_tick;
    while window_start <= last_tick {
        let window_end = window_start + window_ticks;

        // Notes are tick-sorted and windows advance monotonically, so the
        // range start only ever moves forward
        while note_cursor < state.notes.len() && state.notes[note_cursor].tick < window_start {
            note_cursor += 1;
        }
        let mut range_end = note_cursor;
        while range_end < state.notes.len() && state.notes[range_end].tick < window_end {
            range_end += 1;
        }

        state.windows.push(AnalysisWindow {
            start_tick: window_start,
            end_tick: window_end,
            note_range: note_cursor..range_end,
            features: FeatureVector::default(),
            is_candidate: false,
            confidence: 0.0,
        });

        window_start += stride_ticks;
    }

    log::debug!(
        "built {} windows over ticks {}..{}",
        state.windows.len(),
        first_tick,
        last_tick
    );
    Ok(())
}
