//! Tests for the pattern cache: n-gram hashing, novelty scoring, eviction

use filldetect::analysis::ChartNote;
use filldetect::chart::Voice;
use filldetect::config::PatternConfig;
use filldetect::pattern::{extract_ngrams, hash_pattern, PatternCache};

#[cfg(test)]
mod tests {
    use super::*;

    fn note(tick: u64, voice: Voice) -> ChartNote {
        ChartNote {
            tick,
            ms_time: tick as f64,
            length: 0,
            ms_length: 0.0,
            voice,
        }
    }

    #[test]
    fn test_hash_is_offset_invariant() {
        // Same rhythmic shape one bar apart hashes identically
        let a = vec![note(0, Voice::Kick), note(96, Voice::Snare)];
        let b = vec![note(768, Voice::Kick), note(864, Voice::Snare)];

        let ha = hash_pattern(&a, 0, 192, 192, 4);
        let hb = hash_pattern(&b, 768, 960, 192, 4);
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_hash_distinguishes_voices() {
        let kick = vec![note(0, Voice::Kick)];
        let tom = vec![note(0, Voice::Tom)];

        assert_ne!(
            hash_pattern(&kick, 0, 192, 192, 4),
            hash_pattern(&tom, 0, 192, 192, 4)
        );
    }

    #[test]
    fn test_hash_distinguishes_cell_placement() {
        let on_beat = vec![note(0, Voice::Snare)];
        let off_beat = vec![note(96, Voice::Snare)];

        assert_ne!(
            hash_pattern(&on_beat, 0, 192, 192, 4),
            hash_pattern(&off_beat, 0, 192, 192, 4)
        );
    }

    #[test]
    fn test_extract_ngrams_count() {
        // 2-beat window, 1-beat n-grams advancing by half a beat: 3 sub-windows
        let notes = vec![note(0, Voice::Kick), note(192, Voice::Snare)];
        let config = PatternConfig::default();
        let patterns = extract_ngrams(&notes, 0, 384, 192, &config);
        assert_eq!(patterns.len(), 3);
    }

    #[test]
    fn test_novelty_drops_on_repeat() {
        let mut cache = PatternCache::new(1024);
        let patterns = vec![11u64, 22, 33];

        assert_eq!(cache.observe_and_score(&patterns), 1.0);
        assert_eq!(cache.observe_and_score(&patterns), 0.0);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_within_call_repeats_count_once() {
        let mut cache = PatternCache::new(1024);
        // The duplicate is already "seen" by the time it is scored again
        let score = cache.observe_and_score(&[7u64, 7, 9]);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pattern_set_scores_zero() {
        let mut cache = PatternCache::new(1024);
        assert_eq!(cache.observe_and_score(&[]), 0.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_keeps_frequent_patterns() {
        let mut cache = PatternCache::new(16);

        // One hot pattern observed many times
        for _ in 0..10 {
            cache.observe_and_score(&[999u64]);
        }
        // Flood with one-off patterns to push past the size limit
        for p in 0..17u64 {
            cache.observe_and_score(&[p]);
        }

        assert!(cache.len() <= 16);
        // The hot pattern survived eviction: scoring it again is not novel
        assert_eq!(cache.observe_and_score(&[999u64]), 0.0);
    }

    #[test]
    fn test_clear_resets_novelty() {
        let mut cache = PatternCache::new(64);
        cache.observe_and_score(&[1u64, 2]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.observe_and_score(&[1u64, 2]), 1.0);
    }
}
