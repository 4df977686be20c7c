use crate::domain::sample::{Channel, MetricSample};
use crate::error::FetchError;
use crate::ingest::types::ChannelReading;
use crate::time::range::DateRange;
use std::collections::BTreeMap;

#[async_trait::async_trait]
pub trait MetricSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_channel(
        &self,
        access_token: &str,
        channel: Channel,
        range: DateRange,
    ) -> Result<Vec<ChannelReading>, FetchError>;
}

// A 401 wins over other failures so a stale token always takes the refresh path.
pub async fn fetch_all<S>(
    source: &S,
    access_token: &str,
    range: DateRange,
) -> Result<Vec<MetricSample>, FetchError>
where
    S: MetricSource + ?Sized,
{
    let (hrv, br, temp, spo2, rhr) = tokio::join!(
        source.fetch_channel(access_token, Channel::Hrv, range),
        source.fetch_channel(access_token, Channel::BreathingRate, range),
        source.fetch_channel(access_token, Channel::SkinTemperature, range),
        source.fetch_channel(access_token, Channel::OxygenSaturation, range),
        source.fetch_channel(access_token, Channel::RestingHeartRate, range),
    );

    let results = [
        (Channel::Hrv, hrv),
        (Channel::BreathingRate, br),
        (Channel::SkinTemperature, temp),
        (Channel::OxygenSaturation, spo2),
        (Channel::RestingHeartRate, rhr),
    ];

    if let Some(err) = results
        .iter()
        .filter_map(|(_, r)| r.as_ref().err())
        .find(|e| e.is_unauthorized())
    {
        return Err(err.clone());
    }

    let mut per_channel = Vec::with_capacity(results.len());
    for (channel, res) in results {
        let readings = res?;
        tracing::debug!(
            source = source.source_name(),
            %channel,
            %range,
            readings = readings.len(),
            "channel fetched"
        );
        per_channel.push((channel, readings));
    }

    Ok(merge_readings(per_channel))
}

pub fn merge_readings(per_channel: Vec<(Channel, Vec<ChannelReading>)>) -> Vec<MetricSample> {
    let mut by_date = BTreeMap::<chrono::NaiveDate, MetricSample>::new();
    for (channel, readings) in per_channel {
        for reading in readings {
            let sample = by_date
                .entry(reading.date)
                .or_insert_with(|| MetricSample::empty(reading.date));
            if reading.value.is_some() || sample.get(channel).is_none() {
                sample.set(channel, reading.value);
            }
        }
    }
    by_date.into_values().collect()
}
