use thiserror::Error;

/// Every failure the pipeline and dashboards can surface.
///
/// Entry points match on the kind to decide presentation: a stdout line for
/// the jobs, a banner for the dashboards.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Non-success HTTP status, transport failure, or a failed warehouse query.
    #[error("{service} error{}: {message}", fmt_status(.status))]
    ExternalService {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Missing credential file, missing API key, or a malformed setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Warehouse write failed (authentication, missing dataset, insert error).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Chart drawing failed.
    #[error("Render error: {0}")]
    Render(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

impl PipelineError {
    pub fn external(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            status,
            message: message.into(),
        }
    }

    /// Short, stable name of the kind, used in logs and the dashboard banner.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExternalService { .. } => "external_service",
            Self::Configuration(_) => "configuration",
            Self::Persistence(_) => "persistence",
            Self::Render(_) => "render",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ExternalService { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::external("CoinGecko", err.status().map(|s| s.as_u16()), err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
