//! Tests for the tempo map: tick/ms conversion and validation

use filldetect::chart::TempoEvent;
use filldetect::error::FillError;
use filldetect::tempo::TempoMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn tempo(tick: u64, bpm: f64) -> TempoEvent {
        TempoEvent { tick, bpm }
    }

    #[test]
    fn test_constant_tempo_conversion() {
        let map = TempoMap::new(192, &[tempo(0, 120.0)]).unwrap();

        // At 120 BPM one beat (192 ticks) lasts 500 ms
        assert_eq!(map.tick_to_ms(0), 0.0);
        assert!((map.tick_to_ms(192) - 500.0).abs() < 1e-9);
        assert!((map.tick_to_ms(768) - 2000.0).abs() < 1e-9);
        assert_eq!(map.bpm_at(0), 120.0);
        assert_eq!(map.bpm_at(10_000), 120.0);
    }

    #[test]
    fn test_mid_chart_tempo_change() {
        let map = TempoMap::new(192, &[tempo(0, 120.0), tempo(192, 140.0)]).unwrap();

        assert!((map.tick_to_ms(192) - 500.0).abs() < 1e-9);
        // One beat at 140 BPM = 60000/140 ms
        let expected = 500.0 + 60_000.0 / 140.0;
        assert!((map.tick_to_ms(384) - expected).abs() < 1e-6);
        assert_eq!(map.bpm_at(191), 120.0);
        assert_eq!(map.bpm_at(192), 140.0);
    }

    #[test]
    fn test_ms_to_tick_round_trip() {
        let map = TempoMap::new(480, &[tempo(0, 95.0), tempo(960, 180.0), tempo(1920, 60.0)])
            .unwrap();
        for tick in [0u64, 1, 479, 480, 960, 1500, 1920, 5000] {
            let ms = map.tick_to_ms(tick);
            assert_eq!(map.ms_to_tick(ms), tick, "round trip failed at tick {}", tick);
        }
    }

    #[test]
    fn test_tick_to_ms_monotonic() {
        let map = TempoMap::new(192, &[tempo(0, 120.0), tempo(300, 240.0), tempo(700, 80.0)])
            .unwrap();
        let mut prev = -1.0f64;
        for tick in (0..2000).step_by(7) {
            let ms = map.tick_to_ms(tick);
            assert!(ms >= prev, "ms went backwards at tick {}", tick);
            prev = ms;
        }
    }

    #[test]
    fn test_tick_range_to_ms_ordering() {
        let map = TempoMap::new(192, &[tempo(0, 120.0), tempo(192, 140.0)]).unwrap();
        let (start_ms, end_ms) = map.tick_range_to_ms(100, 400);
        assert!(start_ms >= 0.0);
        assert!(end_ms > start_ms);

        let (same_start, same_end) = map.tick_range_to_ms(250, 250);
        assert_eq!(same_start, same_end);
    }

    #[test]
    fn test_empty_tempo_list_rejected() {
        let err = TempoMap::new(192, &[]).unwrap_err();
        assert!(matches!(err, FillError::InvalidTempo(_)));
    }

    #[test]
    fn test_first_event_must_be_tick_zero() {
        let err = TempoMap::new(192, &[tempo(10, 120.0)]).unwrap_err();
        assert!(matches!(err, FillError::InvalidTempo(_)));
    }

    #[test]
    fn test_unsorted_tempo_list_rejected() {
        let err = TempoMap::new(192, &[tempo(0, 120.0), tempo(500, 130.0), tempo(400, 140.0)])
            .unwrap_err();
        assert!(matches!(err, FillError::InvalidTempo(_)));
    }

    #[test]
    fn test_non_positive_bpm_rejected() {
        let err = TempoMap::new(192, &[tempo(0, -120.0)]).unwrap_err();
        assert!(matches!(err, FillError::InvalidTempo(_)));

        let err = TempoMap::new(192, &[tempo(0, 120.0), tempo(192, 0.0)]).unwrap_err();
        assert!(matches!(err, FillError::InvalidTempo(_)));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let err = TempoMap::new(0, &[tempo(0, 120.0)]).unwrap_err();
        assert!(matches!(err, FillError::InvalidChart(_)));
    }
}
