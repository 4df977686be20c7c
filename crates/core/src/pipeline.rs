use crate::auth::TokenRefresher;
use crate::domain::chart::{ChartSeries, SeriesKind};
use crate::domain::sample::{MetricSample, ScoredBatch};
use crate::error::{BatchError, FetchError};
use crate::ingest::source::{fetch_all, MetricSource};
use crate::score::{score, window::window};
use crate::storage::credentials::CredentialStore;
use crate::time::range::DateRange;

// A 401 from any channel refreshes the token and retries the whole batch once.
pub async fn fetch_and_score(
    source: &dyn MetricSource,
    refresher: &dyn TokenRefresher,
    store: &dyn CredentialStore,
    range: DateRange,
) -> Result<ScoredBatch, BatchError> {
    let creds = store
        .load()
        .await
        .map_err(BatchError::Store)?
        .ok_or_else(|| BatchError::auth("no stored access token"))?;

    let samples = match fetch_all(source, &creds.access_token, range).await {
        Ok(samples) => samples,
        Err(FetchError::Unauthorized { channel }) => {
            tracing::warn!(
                %channel,
                %range,
                "access token rejected; refreshing and retrying batch"
            );
            let access_token = refresh_credentials(refresher, store, &creds.refresh_token).await?;
            fetch_all(source, &access_token, range)
                .await
                .map_err(|err| log_fetch_failure(err, range))?
        }
        Err(err) => return Err(log_fetch_failure(err, range)),
    };

    let batch = score_batch(range, samples);
    tracing::info!(
        batch_id = %batch.batch_id,
        %range,
        samples = batch.samples.len(),
        "scored metric batch"
    );
    Ok(batch)
}

pub fn score_batch(range: DateRange, samples: Vec<MetricSample>) -> ScoredBatch {
    ScoredBatch {
        batch_id: uuid::Uuid::new_v4(),
        range,
        fetched_at: chrono::Utc::now(),
        samples: score(&samples),
    }
}

// Requests longer than the fetched range are clamped to it.
pub fn chart_series(batch: &ScoredBatch, days: usize, kind: SeriesKind) -> ChartSeries {
    let days = days.min(batch.range.num_days());
    ChartSeries::from_scored(window(&batch.samples, days), kind)
}

async fn refresh_credentials(
    refresher: &dyn TokenRefresher,
    store: &dyn CredentialStore,
    refresh_token: &str,
) -> Result<String, BatchError> {
    if refresh_token.trim().is_empty() {
        return Err(BatchError::auth("no refresh token available"));
    }

    let token = match refresher.refresh(refresh_token).await {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(
                error = %format!("{err:#}"),
                "token refresh failed; clearing credentials"
            );
            if let Err(clear_err) = store.clear().await {
                tracing::warn!(error = %clear_err, "failed to clear stale credentials");
            }
            return Err(BatchError::auth(format!("token refresh failed: {err:#}")));
        }
    };

    store
        .save(&token.credentials())
        .await
        .map_err(BatchError::Store)?;
    Ok(token.access_token)
}

fn log_fetch_failure(err: FetchError, range: DateRange) -> BatchError {
    match &err {
        FetchError::DataShape { channel, detail } => {
            tracing::warn!(
                %channel,
                %range,
                %detail,
                "metric payload has unexpected shape; batch abandoned"
            );
        }
        FetchError::Network { channel, detail } => {
            tracing::error!(%channel, %range, %detail, "metric fetch failed; batch abandoned");
        }
        FetchError::Unauthorized { channel } => {
            tracing::error!(%channel, %range, "access token rejected after refresh");
        }
    }
    err.into()
}
