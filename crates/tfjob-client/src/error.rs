//! Error types for client construction and requests.

use core::error::Error;

use derive_more::Display;
use error_stack::Report;

/// Result type for client operations.
pub type Result<T> = core::result::Result<T, Report<ClientError>>;

/// Errors that can occur while building clients or talking to the API server.
#[derive(Debug, Display)]
pub enum ClientError {
    /// The configured host cannot be used as a server URL
    #[display("invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[display("GroupVersion is required when initializing a RESTClient")]
    MissingGroupVersion,

    #[display("a codec is required when initializing a RESTClient")]
    MissingCodec,

    /// The underlying HTTP transport could not be built
    #[display("failed to build transport: {message}")]
    Transport { message: String },

    /// The request could not be built or sent
    #[display("request failed: {message}")]
    Request { message: String },

    #[display("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The API server answered with a failure status
    #[display("API error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[display("failed to decode response: {message}")]
    Decode { message: String },

    #[display("failed to encode request body: {message}")]
    Encode { message: String },

    /// The object handed to a verb cannot be sent as is
    #[display("invalid object: {message}")]
    InvalidObject { message: String },
}

impl Error for ClientError {}

impl ClientError {
    /// Whether the error comes from an unusable configuration rather than a
    /// failed request.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidHost { .. }
                | ClientError::MissingGroupVersion
                | ClientError::MissingCodec
                | ClientError::Transport { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { code: 404, .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Api { code: 403, .. })
    }

    pub(crate) fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub(crate) fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => ClientError::Api {
                code: response.code,
                reason: response.reason,
                message: response.message,
            },
            other => ClientError::request(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn classify_config_errors() {
        assert!(ClientError::MissingCodec.is_config_error());
        assert!(ClientError::InvalidHost {
            host: String::new(),
            reason: "empty".to_string(),
        }
        .is_config_error());
        assert!(!ClientError::request("boom").is_config_error());
    }

    #[test]
    fn api_error_from_kube_error() {
        let err = ClientError::from(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "tfjobs.kubeflow.org \"missing\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));

        assert!(err.is_not_found());
        assert!(!err.is_forbidden());
        assert_eq!(
            err.to_string().as_str(),
            "API error 404 (NotFound): tfjobs.kubeflow.org \"missing\" not found"
        );
    }
}
