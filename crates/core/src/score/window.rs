use crate::domain::sample::ScoredSample;

// Statistics come from the full fetched range; this only slices for display.
pub fn window(scored: &[ScoredSample], days: usize) -> &[ScoredSample] {
    let start = scored.len().saturating_sub(days);
    &scored[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::MetricSample;
    use crate::score::{score, score_values};
    use chrono::{Duration, NaiveDate};

    fn series(n: usize) -> Vec<MetricSample> {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        (0..n)
            .map(|i| MetricSample {
                date: start + Duration::days(i as i64),
                hrv: Some(40.0 + ((i * 7) % 11) as f64),
                breathing_rate: Some(14.0 + ((i * 3) % 5) as f64 * 0.4),
                skin_temperature: if i % 4 == 0 {
                    None
                } else {
                    Some(0.5 + (i % 3) as f64 * 0.2)
                },
                oxygen_saturation: Some(95.0 + (i % 4) as f64),
                resting_heart_rate: Some(55.0 + (i % 6) as f64),
            })
            .collect()
    }

    #[test]
    fn window_is_a_suffix_of_the_full_scored_series() {
        let samples = series(30);
        let scored = score(&samples);

        let shown = window(&scored, 7);
        assert_eq!(shown.len(), 7);
        assert_eq!(shown, &scored[23..]);
        assert_eq!(shown[0].sample.date, samples[23].date);
        assert_eq!(shown[6].sample.date, samples[29].date);
    }

    #[test]
    fn window_does_not_rescore_the_visible_days() {
        let samples = series(30);
        let full: Vec<i32> = window(&score(&samples), 7).iter().map(|s| s.score).collect();
        let expected = &score_values(&samples)[23..];
        assert_eq!(full, expected);

        // Rescoring only the visible days uses different statistics.
        let rescored = score_values(&samples[23..]);
        assert_ne!(full, rescored);
    }

    #[test]
    fn window_larger_than_series_returns_everything() {
        let scored = score(&series(5));
        assert_eq!(window(&scored, 7).len(), 5);
        assert!(window(&scored, 0).is_empty());
        assert!(window(&[], 7).is_empty());
    }
}
