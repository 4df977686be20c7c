use crate::config::Settings;
use crate::domain::sample::Channel;
use crate::error::FetchError;
use crate::ingest::source::MetricSource;
use crate::ingest::types::{parse_series, ChannelReading};
use crate::time::range::DateRange;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.fitbit.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub resource: &'static str,
    pub array_key: &'static str,
    pub value_field: &'static str,
}

pub fn endpoint(channel: Channel) -> Endpoint {
    match channel {
        Channel::Hrv => Endpoint {
            resource: "hrv",
            array_key: "hrv",
            value_field: "dailyRmssd",
        },
        Channel::BreathingRate => Endpoint {
            resource: "br",
            array_key: "br",
            value_field: "breathingRate",
        },
        Channel::SkinTemperature => Endpoint {
            resource: "temp/skin",
            array_key: "tempSkin",
            value_field: "nightlyRelative",
        },
        Channel::OxygenSaturation => Endpoint {
            resource: "spo2",
            array_key: "spo2",
            value_field: "avg",
        },
        Channel::RestingHeartRate => Endpoint {
            resource: "activities/heart",
            array_key: "activities-heart",
            value_field: "restingHeartRate",
        },
    }
}

#[derive(Debug, Clone)]
pub struct FitbitClient {
    http: reqwest::Client,
    base_url: String,
}

impl FitbitClient {
    pub fn from_settings(_settings: &Settings) -> Result<Self> {
        let base_url =
            std::env::var("FITBIT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("FITBIT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Fitbit http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, channel: Channel, range: DateRange) -> String {
        format!(
            "{}/1/user/-/{}/date/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            endpoint(channel).resource,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
        )
    }
}

#[async_trait::async_trait]
impl MetricSource for FitbitClient {
    fn source_name(&self) -> &'static str {
        "fitbit"
    }

    async fn fetch_channel(
        &self,
        access_token: &str,
        channel: Channel,
        range: DateRange,
    ) -> Result<Vec<ChannelReading>, FetchError> {
        let network = |detail: String| FetchError::Network { channel, detail };

        let res = self
            .http
            .get(self.url(channel, range))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    network(format!("request timed out: {err}"))
                } else {
                    network(format!("request failed: {err}"))
                }
            })?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%channel, %range, "Fitbit returned 401 for metric request");
            return Err(FetchError::Unauthorized { channel });
        }

        let text = res
            .text()
            .await
            .map_err(|err| network(format!("failed to read response body: {err}")))?;

        if !status.is_success() {
            return Err(network(format!("HTTP {status}: {text}")));
        }

        let body = serde_json::from_str::<Value>(&text).map_err(|err| FetchError::DataShape {
            channel,
            detail: format!("response is not valid JSON: {err}"),
        })?;

        let ep = endpoint(channel);
        parse_series(channel, ep.array_key, ep.value_field, &body)
    }
}
