//! Tests for segment building: merging, boundary refinement, overlap handling

use filldetect::analysis::{
    validate_fill_segments, ChartNote, FeatureVector, FillSegment, FillState,
};
use filldetect::chart::{TempoEvent, Voice};
use filldetect::config::Config;
use filldetect::passes::segments::{self, refine_bounds, resolve_overlaps, snap_to_beat};
use filldetect::passes::windows;
use filldetect::tempo::TempoMap;

#[cfg(test)]
mod tests {
    use super::*;

    const RESOLUTION: u32 = 192;
    const BPM: f64 = 120.0;

    fn ms_of(tick: u64) -> f64 {
        tick as f64 * 60_000.0 / (BPM * RESOLUTION as f64)
    }

    fn note(tick: u64, voice: Voice) -> ChartNote {
        ChartNote {
            tick,
            ms_time: ms_of(tick),
            length: 0,
            ms_length: 0.0,
            voice,
        }
    }

    fn make_state(notes: Vec<ChartNote>) -> FillState {
        let tempo_map = TempoMap::new(RESOLUTION, &[TempoEvent { tick: 0, bpm: BPM }]).unwrap();
        FillState::new("test".to_string(), tempo_map, notes)
    }

    /// Alternating kick/snare, one hit per beat
    fn steady_notes(count: usize) -> Vec<ChartNote> {
        (0..count)
            .map(|b| {
                let voice = if b % 2 == 0 { Voice::Kick } else { Voice::Snare };
                note(b as u64 * RESOLUTION as u64, voice)
            })
            .collect()
    }

    fn seg(song: &str, start_tick: u64, end_tick: u64, groove_dist: f64) -> FillSegment {
        FillSegment {
            song_id: song.to_string(),
            start_tick,
            end_tick,
            start_ms: ms_of(start_tick),
            end_ms: ms_of(end_tick),
            features: FeatureVector {
                groove_dist,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_snap_to_beat() {
        assert_eq!(snap_to_beat(0, RESOLUTION), 0);
        assert_eq!(snap_to_beat(95, RESOLUTION), 0);
        assert_eq!(snap_to_beat(100, RESOLUTION), 192);
        assert_eq!(snap_to_beat(192, RESOLUTION), 192);
        assert_eq!(snap_to_beat(287, RESOLUTION), 192);
        assert_eq!(snap_to_beat(288, RESOLUTION), 384);
        assert_eq!(snap_to_beat(3792, RESOLUTION), 3840);
    }

    #[test]
    fn test_refine_bounds_tightens_to_tom_run() {
        // A groove hit one beat early, then a sixteenth-note tom run
        let mut notes = vec![note(2880, Voice::Snare)];
        let mut tick = 3072;
        while tick <= 3744 {
            notes.push(note(tick, Voice::Tom));
            tick += 48;
        }

        let (start, end) = refine_bounds(&notes, 2880, 4032, RESOLUTION);
        // Start advances to the run; end lands one gap past the last hit,
        // then both snap to the beat grid
        assert_eq!(start, 3072);
        assert_eq!(end, 3840);
    }

    #[test]
    fn test_refine_bounds_without_run_keeps_window_bounds() {
        // No three hits at eighth-note spacing anywhere
        let notes = vec![note(2880, Voice::Kick), note(3100, Voice::Snare)];
        let (start, end) = refine_bounds(&notes, 2880, 3264, RESOLUTION);
        assert_eq!(start, 2880);
        assert_eq!(end, 3264);
    }

    #[test]
    fn test_refine_bounds_never_collapses_to_zero_length() {
        // The whole run snaps onto one beat; the end pushes out a full beat
        let notes = vec![
            note(10, Voice::Tom),
            note(30, Voice::Tom),
            note(50, Voice::Tom),
        ];
        let (start, end) = refine_bounds(&notes, 0, 192, RESOLUTION);
        assert_eq!(start, 0);
        assert_eq!(end, 192);
    }

    #[test]
    fn test_resolve_overlaps_keeps_higher_groove_distance() {
        let out = resolve_overlaps(vec![
            seg("a", 0, 768, 2.0),
            seg("a", 384, 1152, 5.0),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_tick, 384);
    }

    #[test]
    fn test_resolve_overlaps_tie_keeps_earlier() {
        let out = resolve_overlaps(vec![
            seg("a", 384, 1152, 3.0),
            seg("a", 0, 768, 3.0),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_tick, 0);
    }

    #[test]
    fn test_non_overlapping_segments_all_kept_sorted() {
        let out = resolve_overlaps(vec![
            seg("a", 1920, 2304, 1.0),
            seg("a", 0, 384, 1.0),
            seg("a", 768, 1152, 1.0),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].start_tick, 0);
        assert_eq!(out[1].start_tick, 768);
        assert_eq!(out[2].start_tick, 1920);
    }

    #[test]
    fn test_same_ticks_in_different_songs_do_not_overlap() {
        let out = resolve_overlaps(vec![
            seg("a", 0, 768, 1.0),
            seg("b", 0, 768, 1.0),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_nearby_groups_merge_into_one_segment() {
        let config = Config::default();
        let mut state = make_state(steady_notes(12));
        windows::run(&mut state, &config).unwrap();

        // Two candidate runs one beat apart merge under the default gap
        for i in [2usize, 3, 5, 6] {
            state.windows[i].is_candidate = true;
        }
        segments::run(&mut state, &config).unwrap();

        assert_eq!(state.segments.len(), 1);
        let s = &state.segments[0];
        assert_eq!(s.start_tick, 384);
        assert_eq!(s.end_tick, 1536);
        assert!((s.start_ms - ms_of(384)).abs() < 1e-9);
        assert!((s.end_ms - ms_of(1536)).abs() < 1e-9);
    }

    #[test]
    fn test_distant_groups_stay_separate() {
        let config = Config::default();
        let mut state = make_state(steady_notes(12));
        windows::run(&mut state, &config).unwrap();

        for i in [1usize, 2, 7, 8] {
            state.windows[i].is_candidate = true;
        }
        segments::run(&mut state, &config).unwrap();

        assert_eq!(state.segments.len(), 2);
        assert_eq!(state.segments[0].start_tick, 192);
        assert_eq!(state.segments[1].start_tick, 1344);
        assert!(state.segments[0].end_tick <= state.segments[1].start_tick);
    }

    #[test]
    fn test_overlong_merged_group_dropped() {
        let config = Config::default();
        let mut state = make_state(steady_notes(12));
        windows::run(&mut state, &config).unwrap();

        // Nine consecutive candidate windows span 10 beats, over the cap
        for i in 0..=8usize {
            state.windows[i].is_candidate = true;
        }
        segments::run(&mut state, &config).unwrap();
        assert!(state.segments.is_empty());
    }

    #[test]
    fn test_refinement_cannot_undercut_min_duration() {
        let mut config = Config::default();
        config.thresholds.min_beats = 2.0;

        // A lone 3-hit tom burst; tightening onto it alone would leave a
        // 1-beat segment, under the raised duration floor
        let mut notes = steady_notes(12);
        notes.push(note(960, Voice::Tom));
        notes.push(note(1000, Voice::Tom));
        notes.push(note(1040, Voice::Tom));
        notes.sort_by_key(|n| n.tick);

        let mut state = make_state(notes);
        windows::run(&mut state, &config).unwrap();
        let idx = state
            .windows
            .iter()
            .position(|w| w.start_tick == 960)
            .unwrap();
        state.windows[idx].is_candidate = true;
        segments::run(&mut state, &config).unwrap();

        // The 2-beat window bounds stand instead of the tightened ones
        assert_eq!(state.segments.len(), 1);
        let seg = &state.segments[0];
        assert_eq!((seg.start_tick, seg.end_tick), (960, 1344));

        let issues = validate_fill_segments(&state.segments, RESOLUTION, &config.thresholds);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_segment_features_aggregate_across_windows() {
        let config = Config::default();
        let mut state = make_state(steady_notes(12));
        windows::run(&mut state, &config).unwrap();

        state.windows[4].is_candidate = true;
        state.windows[4].features.tom_ratio_jump = 2.0;
        state.windows[4].features.same_pad_burst = true;
        state.windows[5].is_candidate = true;
        state.windows[5].features.tom_ratio_jump = 4.0;
        segments::run(&mut state, &config).unwrap();

        assert_eq!(state.segments.len(), 1);
        let f = &state.segments[0].features;
        assert!((f.tom_ratio_jump - 3.0).abs() < 1e-9);
        assert!(f.same_pad_burst); // OR across windows
    }
}
