use anyhow::{ensure, Context};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> anyhow::Result<Self> {
        ensure!(start <= end, "date range start {start} is after end {end}");
        Ok(Self { start, end })
    }

    pub fn trailing(end: NaiveDate, lookback_days: u32) -> anyhow::Result<Self> {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .with_context(|| {
                format!("lookback of {lookback_days} days before {end} is out of range")
            })?;
        Ok(Self { start, end })
    }

    pub fn num_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

pub fn resolve_end_date(
    end_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = end_date_arg {
        return Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?);
    }
    Ok(now_utc.date_naive())
}
