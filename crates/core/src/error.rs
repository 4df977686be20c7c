use crate::domain::sample::Channel;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    Unauthorized { channel: Channel },
    Network { channel: Channel, detail: String },
    DataShape { channel: Channel, detail: String },
}

impl FetchError {
    pub fn channel(&self) -> Channel {
        match self {
            FetchError::Unauthorized { channel }
            | FetchError::Network { channel, .. }
            | FetchError::DataShape { channel, .. } => *channel,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Unauthorized { channel } => {
                write!(f, "{channel} endpoint rejected the access token (HTTP 401)")
            }
            FetchError::Network { channel, detail } => {
                write!(f, "{channel} endpoint request failed: {detail}")
            }
            FetchError::DataShape { channel, detail } => {
                write!(f, "{channel} endpoint returned an unexpected body: {detail}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug)]
pub enum BatchError {
    Auth { detail: String },
    Network { detail: String },
    DataShape { detail: String },
    Store(anyhow::Error),
}

impl BatchError {
    pub fn auth(detail: impl Into<String>) -> Self {
        BatchError::Auth {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::Auth { .. } => "auth",
            BatchError::Network { .. } => "network",
            BatchError::DataShape { .. } => "data_shape",
            BatchError::Store(_) => "store",
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Auth { detail } => write!(f, "authorization required: {detail}"),
            BatchError::Network { detail } => write!(f, "metric fetch failed: {detail}"),
            BatchError::DataShape { detail } => write!(f, "unexpected metric payload: {detail}"),
            BatchError::Store(err) => write!(f, "credential store failed: {err:#}"),
        }
    }
}

impl std::error::Error for BatchError {}

impl From<FetchError> for BatchError {
    fn from(err: FetchError) -> Self {
        let detail = err.to_string();
        match err {
            FetchError::Unauthorized { .. } => BatchError::Auth { detail },
            FetchError::Network { .. } => BatchError::Network { detail },
            FetchError::DataShape { .. } => BatchError::DataShape { detail },
        }
    }
}
