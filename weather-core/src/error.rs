use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderId;

/// Failure of a single provider call.
///
/// Transport problems (`Request`, `Http`) are kept apart from a provider
/// answering with a failure code in the body (`Rejected`), so callers can
/// tell a broken network from a refused query.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(
        "No API key configured for provider '{provider}'.\n\
         Hint: set {env_var} or run `weather configure {provider}`."
    )]
    MissingCredential {
        provider: ProviderId,
        env_var: &'static str,
    },

    #[error("Failed to send request to {provider}: {source}")]
    Request {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed with HTTP status {status}: {body}")]
    Http {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },

    #[error("{provider} API error (code {code}): {message}")]
    Rejected {
        provider: ProviderId,
        code: String,
        message: String,
    },

    #[error("Failed to parse {provider} JSON: {source}")]
    Decode {
        provider: ProviderId,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} found no location matching '{query}'")]
    NotFound { provider: ProviderId, query: String },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::MissingCredential { provider, .. }
            | ProviderError::Request { provider, .. }
            | ProviderError::Http { provider, .. }
            | ProviderError::Rejected { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::NotFound { provider, .. } => *provider,
        }
    }

    /// True for failures below the provider protocol: connection errors
    /// and non-2xx HTTP responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Request { .. } | ProviderError::Http { .. })
    }

    /// True when the provider answered but flagged the request as failed.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. })
    }
}
