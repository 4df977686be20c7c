use crate::time::range::DateRange;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Hrv,
    BreathingRate,
    SkinTemperature,
    OxygenSaturation,
    RestingHeartRate,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Hrv,
        Channel::BreathingRate,
        Channel::SkinTemperature,
        Channel::OxygenSaturation,
        Channel::RestingHeartRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Hrv => "hrv",
            Channel::BreathingRate => "breathing_rate",
            Channel::SkinTemperature => "skin_temperature",
            Channel::OxygenSaturation => "oxygen_saturation",
            Channel::RestingHeartRate => "resting_heart_rate",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            Channel::Hrv => 0.30,
            Channel::BreathingRate => 0.20,
            Channel::SkinTemperature => 0.20,
            Channel::OxygenSaturation => 0.10,
            Channel::RestingHeartRate => 0.20,
        }
    }

    pub fn is_inverted(self) -> bool {
        matches!(self, Channel::BreathingRate | Channel::RestingHeartRate)
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Hrv => "ms",
            Channel::BreathingRate => "breaths/min",
            Channel::SkinTemperature => "°C deviation",
            Channel::OxygenSaturation => "%",
            Channel::RestingHeartRate => "bpm",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown metric channel: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub date: NaiveDate,
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(default)]
    pub breathing_rate: Option<f64>,
    #[serde(default)]
    pub skin_temperature: Option<f64>,
    #[serde(default)]
    pub oxygen_saturation: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
}

impl MetricSample {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            hrv: None,
            breathing_rate: None,
            skin_temperature: None,
            oxygen_saturation: None,
            resting_heart_rate: None,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Hrv => self.hrv,
            Channel::BreathingRate => self.breathing_rate,
            Channel::SkinTemperature => self.skin_temperature,
            Channel::OxygenSaturation => self.oxygen_saturation,
            Channel::RestingHeartRate => self.resting_heart_rate,
        }
    }

    pub fn set(&mut self, channel: Channel, value: Option<f64>) {
        let slot = match channel {
            Channel::Hrv => &mut self.hrv,
            Channel::BreathingRate => &mut self.breathing_rate,
            Channel::SkinTemperature => &mut self.skin_temperature,
            Channel::OxygenSaturation => &mut self.oxygen_saturation,
            Channel::RestingHeartRate => &mut self.resting_heart_rate,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    #[serde(flatten)]
    pub sample: MetricSample,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredBatch {
    pub batch_id: uuid::Uuid,
    pub range: DateRange,
    pub fetched_at: DateTime<Utc>,
    pub samples: Vec<ScoredSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = Channel::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parses_channel_names() {
        assert_eq!("hrv".parse::<Channel>().unwrap(), Channel::Hrv);
        assert_eq!(
            "Resting_Heart_Rate".parse::<Channel>().unwrap(),
            Channel::RestingHeartRate
        );
        assert!("steps".parse::<Channel>().is_err());
    }

    #[test]
    fn missing_fields_deserialize_as_none_not_zero() {
        let s: MetricSample =
            serde_json::from_str(r#"{"date":"2026-01-05","hrv":42.5,"oxygen_saturation":0}"#)
                .unwrap();
        assert_eq!(s.hrv, Some(42.5));
        assert_eq!(s.oxygen_saturation, Some(0.0));
        assert_eq!(s.breathing_rate, None);
        assert_eq!(s.get(Channel::RestingHeartRate), None);
    }
}
