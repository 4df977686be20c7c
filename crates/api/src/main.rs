use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitscore_core::auth::OAuthClient;
use fitscore_core::domain::chart::{ChartPoint, SeriesKind};
use fitscore_core::error::BatchError;
use fitscore_core::ingest::fitbit::FitbitClient;
use fitscore_core::pipeline::{chart_series, fetch_and_score};
use fitscore_core::storage::credentials::{store_from_settings, CredentialStore};
use fitscore_core::time::range::DateRange;

mod ui;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fitscore_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = store_from_settings(&settings).await.map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        e
    })?;
    let oauth = OAuthClient::from_settings(&settings)?;
    let source = FitbitClient::from_settings(&settings)?;

    let state = AppState {
        source: Arc::new(source),
        oauth: Arc::new(oauth),
        store,
        lookback_days: settings.lookback_days,
        display_days: settings.display_days,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/authorize", get(authorize))
        .route("/logout", post(logout))
        .route("/api/chart", get(get_chart))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Arc<FitbitClient>,
    oauth: Arc<OAuthClient>,
    store: Arc<dyn CredentialStore>,
    lookback_days: u32,
    display_days: usize,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    if let Some(error) = params.error {
        tracing::warn!(%error, "authorization was denied");
        return Err(ApiError::BadRequest(format!("authorization failed: {error}")));
    }

    let Some(code) = params.code else {
        return Ok(Html(ui::render_index(state.display_days)).into_response());
    };

    state
        .oauth
        .exchange_and_store(state.store.as_ref(), &code)
        .await
        .map_err(ApiError::TokenExchange)?;

    Ok(Redirect::to("/").into_response())
}

async fn authorize(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state.oauth.authorize_url().map_err(ApiError::Internal)?;
    Ok(Redirect::to(&url))
}

async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.clear().await.map_err(ApiError::Internal)?;
    tracing::info!("cleared stored credentials");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuery {
    days: Option<usize>,
    series: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    batch_id: uuid::Uuid,
    range: DateRange,
    label: String,
    points: Vec<ChartPoint>,
}

fn resolve_chart_query(
    query: &ChartQuery,
    display_days: usize,
) -> Result<(usize, SeriesKind), ApiError> {
    let days = query.days.unwrap_or(display_days);
    if days == 0 {
        return Err(ApiError::BadRequest("days must be at least 1".to_string()));
    }

    let kind = match query.series.as_deref() {
        Some(s) => s
            .parse::<SeriesKind>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => SeriesKind::Score,
    };

    Ok((days, kind))
}

async fn get_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, ApiError> {
    let (days, kind) = resolve_chart_query(&query, state.display_days)?;
    let range = DateRange::trailing(Utc::now().date_naive(), state.lookback_days)
        .map_err(ApiError::Internal)?;

    let batch = fetch_and_score(
        state.source.as_ref(),
        state.oauth.as_ref(),
        state.store.as_ref(),
        range,
    )
    .await
    .map_err(ApiError::Batch)?;

    let series = chart_series(&batch, days, kind);
    Ok(Json(ChartResponse {
        batch_id: batch.batch_id,
        range: batch.range,
        label: series.label,
        points: series.points,
    }))
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    TokenExchange(anyhow::Error),
    Batch(BatchError),
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorize_url: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    detail,
                    authorize_url: None,
                },
            ),
            ApiError::TokenExchange(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(
                    error = %format!("{err:#}"),
                    "authorization code exchange failed"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "token_exchange",
                        detail: format!("{err:#}"),
                        authorize_url: Some("/authorize"),
                    },
                )
            }
            ApiError::Batch(err) => {
                let status = match &err {
                    BatchError::Auth { .. } => StatusCode::UNAUTHORIZED,
                    BatchError::Network { .. } | BatchError::DataShape { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    BatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if !matches!(err, BatchError::Auth { .. }) {
                    sentry::capture_error(&err);
                }
                let authorize_url =
                    matches!(err, BatchError::Auth { .. }).then_some("/authorize");
                (
                    status,
                    ErrorBody {
                        error: err.kind(),
                        detail: err.to_string(),
                        authorize_url,
                    },
                )
            }
            ApiError::Internal(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal",
                        detail: format!("{err:#}"),
                        authorize_url: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fitscore_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
