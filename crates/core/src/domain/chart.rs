use crate::domain::sample::{Channel, ScoredSample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesKind {
    #[default]
    Score,
    Raw(Channel),
}

impl SeriesKind {
    pub fn dataset_label(self) -> String {
        match self {
            SeriesKind::Score => "Composite score".to_string(),
            SeriesKind::Raw(channel) => format!("{} ({})", channel, channel.unit()),
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Score => f.write_str("score"),
            SeriesKind::Raw(channel) => write!(f, "{channel}"),
        }
    }
}

impl FromStr for SeriesKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("score") {
            return Ok(SeriesKind::Score);
        }
        Ok(SeriesKind::Raw(t.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn from_scored(scored: &[ScoredSample], kind: SeriesKind) -> Self {
        let points = scored
            .iter()
            .map(|s| ChartPoint {
                label: s.sample.date.to_string(),
                value: match kind {
                    SeriesKind::Score => Some(f64::from(s.score)),
                    SeriesKind::Raw(channel) => s.sample.get(channel),
                },
            })
            .collect();

        Self {
            label: kind.dataset_label(),
            points,
        }
    }
}
