pub mod window;

use crate::domain::sample::{Channel, MetricSample, ScoredSample};

const EPSILON: f64 = 1e-8;
const SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PopulationStats {
    mean: f64,
    std_dev: f64,
}

// Absent days are excluded, not zero-filled.
fn population_stats(values: &[Option<f64>]) -> Option<PopulationStats> {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if present.is_empty() {
        return None;
    }

    // All-equal values have zero spread; summing could leave rounding noise in the mean.
    let first = present[0];
    if present.iter().all(|v| *v == first) {
        return Some(PopulationStats {
            mean: first,
            std_dev: 0.0,
        });
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(PopulationStats {
        mean,
        std_dev: variance.sqrt(),
    })
}

fn z_scores(values: &[Option<f64>]) -> Vec<f64> {
    let Some(stats) = population_stats(values) else {
        return vec![0.0; values.len()];
    };
    if stats.std_dev == 0.0 {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => (v - stats.mean) / (stats.std_dev + EPSILON),
            _ => 0.0,
        })
        .collect()
}

// Skin temperature is scored as relative deviation from its own mean, not as a z-score.
fn baseline_relative(values: &[Option<f64>]) -> Vec<f64> {
    let baseline = match population_stats(values) {
        Some(stats) if stats.mean != 0.0 && stats.mean.is_finite() => stats.mean,
        _ => return vec![0.0; values.len()],
    };

    values
        .iter()
        .map(|v| match v {
            Some(v) => {
                let rel = (v - baseline) / baseline;
                if rel.is_finite() {
                    rel
                } else {
                    0.0
                }
            }
            None => 0.0,
        })
        .collect()
}

pub fn standardize_channel(samples: &[MetricSample], channel: Channel) -> Vec<f64> {
    let values: Vec<Option<f64>> = samples.iter().map(|s| s.get(channel)).collect();

    let mut out = match channel {
        Channel::SkinTemperature => baseline_relative(&values),
        _ => z_scores(&values),
    };

    if channel.is_inverted() {
        for v in &mut out {
            *v = -*v;
        }
    }
    out
}

pub fn composite(samples: &[MetricSample]) -> Vec<f64> {
    let mut out = vec![0.0; samples.len()];
    for channel in Channel::ALL {
        let weight = channel.weight();
        for (acc, z) in out.iter_mut().zip(standardize_channel(samples, channel)) {
            *acc += z * weight;
        }
    }
    out
}

// Rounds half away from zero. Non-finite composites become 0.
fn to_score(composite: f64) -> i32 {
    let scaled = composite * SCALE;
    if !scaled.is_finite() {
        return 0;
    }
    scaled.round() as i32
}

pub fn score_values(samples: &[MetricSample]) -> Vec<i32> {
    composite(samples).into_iter().map(to_score).collect()
}

pub fn score(samples: &[MetricSample]) -> Vec<ScoredSample> {
    samples
        .iter()
        .cloned()
        .zip(score_values(samples))
        .map(|(sample, score)| ScoredSample { sample, score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Duration::days(i as i64)
    }

    fn sample(i: usize, hrv: f64, br: f64, temp: f64, spo2: f64, rhr: f64) -> MetricSample {
        MetricSample {
            date: day(i),
            hrv: Some(hrv),
            breathing_rate: Some(br),
            skin_temperature: Some(temp),
            oxygen_saturation: Some(spo2),
            resting_heart_rate: Some(rhr),
        }
    }

    fn varied_series() -> Vec<MetricSample> {
        vec![
            sample(0, 42.0, 15.2, -0.4, 96.1, 58.0),
            sample(1, 55.0, 14.8, 0.1, 97.3, 56.0),
            sample(2, 38.5, 16.1, 0.6, 95.0, 61.0),
            sample(3, 47.0, 15.0, -0.2, 96.8, 57.0),
            sample(4, 60.2, 14.1, 0.3, 97.9, 54.0),
        ]
    }

    #[test]
    fn constant_channel_standardizes_to_zero() {
        let samples: Vec<_> = (0..4)
            .map(|i| sample(i, 30.0 + i as f64, 15.2, -0.3, 96.1, 58.7))
            .collect();
        for channel in [
            Channel::BreathingRate,
            Channel::SkinTemperature,
            Channel::OxygenSaturation,
            Channel::RestingHeartRate,
        ] {
            let col = standardize_channel(&samples, channel);
            assert!(col.iter().all(|v| *v == 0.0), "{channel}: {col:?}");
        }
    }

    #[test]
    fn single_day_scores_zero() {
        let samples = vec![sample(0, 80.0, 12.0, 1.5, 99.0, 45.0)];
        assert_eq!(score_values(&samples), vec![0]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(score(&[]).is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let mut samples = varied_series();
        samples[2].oxygen_saturation = None;
        samples[4].hrv = None;

        let first = score(&samples);
        for _ in 0..3 {
            assert_eq!(score(&samples), first);
        }
        assert_eq!(first.len(), samples.len());
        for (s, scored) in samples.iter().zip(&first) {
            assert_eq!(&scored.sample, s);
        }
    }

    #[test]
    fn hrv_ramp_with_flat_channels() {
        let samples = vec![
            sample(0, 10.0, 15.0, -0.5, 96.0, 60.0),
            sample(1, 20.0, 15.0, -0.5, 96.0, 60.0),
            sample(2, 30.0, 15.0, -0.5, 96.0, 60.0),
        ];
        // z = ±10 / sqrt(200/3) ≈ ±1.2247; × 0.30 × 10 ≈ ±3.674.
        assert_eq!(score_values(&samples), vec![-4, 0, 4]);
    }

    #[test]
    fn degenerate_channels_are_not_renormalized() {
        let samples: Vec<_> = [10.0, 20.0, 30.0]
            .into_iter()
            .enumerate()
            .map(|(i, hrv)| MetricSample {
                hrv: Some(hrv),
                ..MetricSample::empty(day(i))
            })
            .collect();
        // Other channels are entirely null and contribute 0; HRV keeps its 0.30 weight.
        assert_eq!(score_values(&samples), vec![-4, 0, 4]);
    }

    #[test]
    fn null_days_are_excluded_from_statistics() {
        let samples = vec![
            MetricSample {
                hrv: Some(10.0),
                ..MetricSample::empty(day(0))
            },
            MetricSample::empty(day(1)),
            MetricSample {
                hrv: Some(30.0),
                ..MetricSample::empty(day(2))
            },
        ];

        let col = standardize_channel(&samples, Channel::Hrv);
        // Population is {10, 30}: mean 20, std 10. Zero-filling would give mean 40/3.
        assert!((col[0] + 1.0).abs() < 1e-6);
        assert_eq!(col[1], 0.0);
        assert!((col[2] - 1.0).abs() < 1e-6);

        assert_eq!(score_values(&samples), vec![-3, 0, 3]);
    }

    #[test]
    fn skin_temperature_uses_baseline_relative_deviation() {
        let samples = vec![
            sample(0, 50.0, 15.0, 1.0, 96.0, 60.0),
            sample(1, 50.0, 15.0, 3.0, 96.0, 60.0),
        ];
        let col = standardize_channel(&samples, Channel::SkinTemperature);
        assert_eq!(col, vec![-0.5, 0.5]);
        assert_eq!(score_values(&samples), vec![-1, 1]);
    }

    #[test]
    fn zero_skin_temperature_baseline_contributes_nothing() {
        let samples = vec![
            sample(0, 50.0, 15.0, -0.5, 96.0, 60.0),
            sample(1, 50.0, 15.0, 0.5, 96.0, 60.0),
        ];
        let col = standardize_channel(&samples, Channel::SkinTemperature);
        assert_eq!(col, vec![0.0, 0.0]);
        assert_eq!(score_values(&samples), vec![0, 0]);
    }

    #[test]
    fn inverted_channels_flip_sign() {
        let samples = vec![
            sample(0, 50.0, 14.0, 0.2, 96.0, 55.0),
            sample(1, 50.0, 18.0, 0.2, 96.0, 65.0),
        ];
        let br = standardize_channel(&samples, Channel::BreathingRate);
        let rhr = standardize_channel(&samples, Channel::RestingHeartRate);
        assert!(br[0] > 0.0 && br[1] < 0.0);
        assert!(rhr[0] > 0.0 && rhr[1] < 0.0);
    }

    #[test]
    fn raising_breathing_rate_never_raises_that_days_score() {
        let base = varied_series();
        let before = score_values(&base);
        for i in 0..base.len() {
            let mut bumped = base.clone();
            bumped[i].breathing_rate = bumped[i].breathing_rate.map(|v| v + 2.5);
            let after = score_values(&bumped);
            assert!(after[i] <= before[i], "day {i}: {} -> {}", before[i], after[i]);
        }
    }

    #[test]
    fn raising_hrv_never_lowers_that_days_score() {
        let base = varied_series();
        let before = score_values(&base);
        for i in 0..base.len() {
            let mut bumped = base.clone();
            bumped[i].hrv = bumped[i].hrv.map(|v| v + 12.0);
            let after = score_values(&bumped);
            assert!(after[i] >= before[i], "day {i}: {} -> {}", before[i], after[i]);
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_score(0.25), 3);
        assert_eq!(to_score(-0.25), -3);
        assert_eq!(to_score(0.04), 0);
        assert_eq!(to_score(f64::NAN), 0);
        assert_eq!(to_score(f64::INFINITY), 0);
    }
}
