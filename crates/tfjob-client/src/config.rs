//! Connection configuration.
//!
//! [`RestConfig`] carries everything needed to reach an API server: host,
//! credentials, TLS roots, throttling and the request defaults applied by
//! the group-versioned clients. Constructors of this crate take it by
//! reference and work on a clone, so the caller's copy is never changed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use http::Uri;
use kube::config::AuthInfo;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::core::GroupVersion;

use crate::error::ClientError;
use crate::error::Result;
use crate::rate_limit::RateLimiter;
use crate::scheme::Codec;

/// Requests per second used when a config leaves `qps` at zero.
pub const DEFAULT_QPS: f32 = 5.0;
/// Burst used when a config leaves `burst` at zero.
pub const DEFAULT_BURST: u32 = 10;

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Server URL, or a bare `host:port` which is assumed to speak https
    pub host: String,
    /// Prefix placed before the group/version path segments
    pub api_path: String,
    pub group_version: Option<GroupVersion>,
    pub codec: Option<Codec>,
    /// Empty means unset
    pub user_agent: String,
    /// Negative disables client side throttling
    pub qps: f32,
    pub burst: u32,
    /// Takes precedence over `qps`/`burst` when set
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub auth_info: AuthInfo,
    pub root_cert: Option<Vec<Vec<u8>>>,
    pub accept_invalid_certs: bool,
    /// Overrides the server name checked against the serving certificate
    pub tls_server_name: Option<String>,
    pub proxy_url: Option<Uri>,
    /// Read timeout of the transport
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub default_namespace: String,
}

impl RestConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_path: String::new(),
            group_version: None,
            codec: None,
            user_agent: String::new(),
            qps: 0.0,
            burst: 0,
            rate_limiter: None,
            auth_info: AuthInfo::default(),
            root_cert: None,
            accept_invalid_certs: false,
            tls_server_name: None,
            proxy_url: None,
            timeout: None,
            connect_timeout: None,
            write_timeout: None,
            default_namespace: "default".to_string(),
        }
    }

    /// Take connection settings from a config resolved by `kube`.
    pub fn from_kube_config(config: kube::Config) -> Self {
        let mut rest_config = Self::new(config.cluster_url.to_string());
        rest_config.auth_info = config.auth_info;
        rest_config.root_cert = config.root_cert;
        rest_config.accept_invalid_certs = config.accept_invalid_certs;
        rest_config.tls_server_name = config.tls_server_name;
        rest_config.proxy_url = config.proxy_url;
        rest_config.timeout = config.read_timeout;
        rest_config.connect_timeout = config.connect_timeout;
        rest_config.write_timeout = config.write_timeout;
        rest_config.default_namespace = config.default_namespace;
        rest_config
    }

    /// Load the in-cluster config, falling back to the local kubeconfig.
    pub async fn infer() -> Result<Self> {
        let config = kube::Config::infer()
            .await
            .change_context(ClientError::Transport {
                message: "failed to infer Kubernetes configuration".to_string(),
            })?;
        Ok(Self::from_kube_config(config))
    }

    /// Load the current context of the kubeconfig file at `path`.
    pub async fn from_kubeconfig_file(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path).change_context(ClientError::Transport {
            message: format!("failed to read kubeconfig file: {}", path.display()),
        })?;

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .change_context(ClientError::Transport {
                message: format!("failed to create config from kubeconfig: {}", path.display()),
            })?;
        Ok(Self::from_kube_config(config))
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_rate_limits(mut self, qps: f32, burst: u32) -> Self {
        self.qps = qps;
        self.burst = burst;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_auth_info(mut self, auth_info: AuthInfo) -> Self {
        self.auth_info = auth_info;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parse and validate `host` as the server URL.
    pub fn server_url(&self) -> Result<Uri> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(Report::new(ClientError::InvalidHost {
                host: self.host.clone(),
                reason: "host must be a URL or a host:port pair".to_string(),
            }));
        }

        let candidate = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let uri = candidate.parse::<Uri>().change_context_lazy(|| ClientError::InvalidHost {
            host: self.host.clone(),
            reason: "not a valid URL".to_string(),
        })?;

        match (uri.scheme_str(), uri.authority()) {
            (Some("http" | "https"), Some(_)) => Ok(uri),
            (Some(scheme), Some(_)) => Err(Report::new(ClientError::InvalidHost {
                host: self.host.clone(),
                reason: format!("unsupported scheme {scheme:?}"),
            })),
            _ => Err(Report::new(ClientError::InvalidHost {
                host: self.host.clone(),
                reason: "URL has no host".to_string(),
            })),
        }
    }

    /// Build the `kube` transport configuration for this connection.
    pub(crate) fn to_kube_config(&self) -> Result<kube::Config> {
        let mut config = kube::Config::new(self.server_url()?);
        config.default_namespace = self.default_namespace.clone();
        config.root_cert = self.root_cert.clone();
        config.accept_invalid_certs = self.accept_invalid_certs;
        config.auth_info = self.auth_info.clone();
        config.tls_server_name = self.tls_server_name.clone();
        config.proxy_url = self.proxy_url.clone();
        // unset timeouts keep the transport defaults
        if let Some(timeout) = self.timeout {
            config.read_timeout = Some(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = Some(timeout);
        }
        if let Some(timeout) = self.write_timeout {
            config.write_timeout = Some(timeout);
        }
        Ok(config)
    }
}

/// User agent sent when the config does not set one, in the form
/// `<command>/<version> (<os>/<arch>) kubeflow/<commit>`.
pub fn default_user_agent() -> String {
    let command = std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "{command}/{} ({}/{}) kubeflow/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        utils::version::short_commit()
    )
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::rate_limit::TokenBucketRateLimiter;

    #[test]
    fn new_config_has_no_request_defaults() {
        let config = RestConfig::new("https://10.0.0.1:6443");

        assert_eq!(config.api_path.as_str(), "");
        assert!(config.group_version.is_none());
        assert!(config.codec.is_none());
        assert!(config.user_agent.is_empty());
        assert!(config.rate_limiter.is_none());
        assert_eq!(config.default_namespace.as_str(), "default");
    }

    #[test]
    fn builder_methods() {
        let limiter: Arc<dyn RateLimiter> = Arc::new(TokenBucketRateLimiter::new(1.0, 1));
        let config = RestConfig::new("http://localhost:8080")
            .with_user_agent("tfctl/0.1")
            .with_rate_limits(20.0, 40)
            .with_rate_limiter(Arc::clone(&limiter))
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.user_agent.as_str(), "tfctl/0.1");
        assert_eq!(config.qps, 20.0);
        assert_eq!(config.burst, 40);
        assert!(Arc::ptr_eq(config.rate_limiter.as_ref().expect("limiter"), &limiter));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn server_url_accepts_urls_and_bare_hosts() {
        let uri = RestConfig::new("http://localhost:8080")
            .server_url()
            .expect("valid url");
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.port_u16(), Some(8080));

        let uri = RestConfig::new("10.0.0.1:6443")
            .server_url()
            .expect("bare host defaults to https");
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.host(), Some("10.0.0.1"));
    }

    #[test]
    fn server_url_rejects_invalid_hosts() {
        for host in ["", "   ", "http://bad host", "ftp://files.example.com"] {
            let err = RestConfig::new(host)
                .server_url()
                .expect_err("host should be rejected");
            assert!(
                matches!(err.current_context(), ClientError::InvalidHost { .. }),
                "unexpected error for {host:?}: {err:?}"
            );
        }
    }

    #[test]
    fn kube_config_carries_connection_settings() {
        let config = RestConfig::new("https://api.example.com")
            .with_timeout(Duration::from_secs(7));

        let kube_config = config.to_kube_config().expect("valid config");
        assert_eq!(kube_config.cluster_url.host(), Some("api.example.com"));
        assert_eq!(kube_config.read_timeout, Some(Duration::from_secs(7)));
        assert_eq!(kube_config.default_namespace.as_str(), "default");
    }

    #[test]
    fn from_kube_config_round_trips_host() {
        let kube_config = kube::Config::new("http://127.0.0.1:8001".parse().expect("uri"));

        let config = RestConfig::from_kube_config(kube_config);
        assert!(config.host.starts_with("http://127.0.0.1:8001"));
        assert!(config.server_url().is_ok());
    }

    #[test]
    fn kube_config_round_trip_keeps_connection_settings() {
        let mut kube_config = kube::Config::new("https://10.0.0.1:6443".parse().expect("uri"));
        kube_config.proxy_url = Some("http://proxy.local:3128".parse().expect("proxy uri"));
        kube_config.tls_server_name = Some("kubernetes.default".to_string());
        kube_config.connect_timeout = Some(Duration::from_secs(4));
        kube_config.write_timeout = Some(Duration::from_secs(9));

        let config = RestConfig::from_kube_config(kube_config);
        assert_eq!(config.tls_server_name.as_deref(), Some("kubernetes.default"));

        let kube_config = config.to_kube_config().expect("valid config");
        let proxy = kube_config.proxy_url.as_ref().expect("proxy kept");
        assert_eq!(proxy.host(), Some("proxy.local"));
        assert_eq!(proxy.port_u16(), Some(3128));
        assert_eq!(kube_config.tls_server_name.as_deref(), Some("kubernetes.default"));
        assert_eq!(kube_config.connect_timeout, Some(Duration::from_secs(4)));
        assert_eq!(kube_config.write_timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn default_user_agent_shape() {
        let user_agent = default_user_agent();

        assert!(!user_agent.is_empty());
        assert!(user_agent.contains(env!("CARGO_PKG_VERSION")));
        assert!(user_agent.contains(std::env::consts::OS));
        assert!(user_agent.contains(" kubeflow/"));
    }
}
