pub mod auth;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod score;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    const DEFAULT_LOOKBACK_DAYS: u32 = 30;
    const DEFAULT_DISPLAY_DAYS: usize = 7;
    const DEFAULT_CREDENTIALS_PATH: &str = ".fitscore/credentials.json";
    const MAX_LOOKBACK_DAYS: u32 = 3650;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub fitbit_client_id: Option<String>,
        pub fitbit_client_secret: Option<String>,
        pub fitbit_redirect_uri: Option<String>,
        pub credentials_path: String,
        pub lookback_days: u32,
        pub display_days: usize,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let lookback_days = parse_lookback_days(std::env::var("FITSCORE_LOOKBACK_DAYS").ok())?;
            let display_days = parse_display_days(std::env::var("FITSCORE_DISPLAY_DAYS").ok())?;

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                fitbit_client_id: std::env::var("FITBIT_CLIENT_ID").ok(),
                fitbit_client_secret: std::env::var("FITBIT_CLIENT_SECRET").ok(),
                fitbit_redirect_uri: std::env::var("FITBIT_REDIRECT_URI").ok(),
                credentials_path: std::env::var("FITSCORE_CREDENTIALS_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string()),
                lookback_days,
                display_days,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_fitbit_client_id(&self) -> anyhow::Result<&str> {
            self.fitbit_client_id
                .as_deref()
                .context("FITBIT_CLIENT_ID is required")
        }

        pub fn require_fitbit_client_secret(&self) -> anyhow::Result<&str> {
            self.fitbit_client_secret
                .as_deref()
                .context("FITBIT_CLIENT_SECRET is required")
        }
    }

    fn parse_lookback_days(raw: Option<String>) -> anyhow::Result<u32> {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(DEFAULT_LOOKBACK_DAYS);
        };
        let days = raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("FITSCORE_LOOKBACK_DAYS is not a number: {raw:?}"))?;
        anyhow::ensure!(
            days <= MAX_LOOKBACK_DAYS,
            "FITSCORE_LOOKBACK_DAYS must be at most {MAX_LOOKBACK_DAYS}, got {days}"
        );
        Ok(days)
    }

    fn parse_display_days(raw: Option<String>) -> anyhow::Result<usize> {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(DEFAULT_DISPLAY_DAYS);
        };
        let days = raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("FITSCORE_DISPLAY_DAYS is not a number: {raw:?}"))?;
        anyhow::ensure!(days > 0, "FITSCORE_DISPLAY_DAYS must be at least 1");
        Ok(days)
    }

}
