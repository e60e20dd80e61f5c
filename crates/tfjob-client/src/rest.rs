//! REST transport bound to one API group/version.

use std::fmt;
use std::sync::Arc;

use error_stack::Report;
use error_stack::ResultExt;
use http::Method;
use kube::core::GroupVersion;

use crate::config::RestConfig;
use crate::config::DEFAULT_BURST;
use crate::config::DEFAULT_QPS;
use crate::error::ClientError;
use crate::error::Result;
use crate::rate_limit::RateLimiter;
use crate::rate_limit::TokenBucketRateLimiter;
use crate::request::PatchType;
use crate::request::Request;
use crate::scheme::Codec;

/// Handle to the API server for one group/version.
///
/// Cloning is cheap: clones share the underlying `kube::Client` connection
/// pool and the rate limiter.
#[derive(Clone)]
pub struct RestClient {
    client: kube::Client,
    content: Arc<ClientContent>,
}

#[derive(Debug)]
pub(crate) struct ClientContent {
    pub(crate) api_path: String,
    pub(crate) group_version: Option<GroupVersion>,
    pub(crate) codec: Codec,
    pub(crate) user_agent: String,
    pub(crate) rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl RestClient {
    /// Build a client for the group/version named in `config`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingGroupVersion`] if `config.group_version` is unset
    /// - [`ClientError::MissingCodec`] if `config.codec` is unset
    /// - [`ClientError::InvalidHost`] or [`ClientError::Transport`] if the
    ///   transport cannot be built
    pub fn for_config(config: &RestConfig) -> Result<Self> {
        if config.group_version.is_none() {
            return Err(Report::new(ClientError::MissingGroupVersion));
        }
        Self::unversioned_for_config(config)
    }

    /// Like [`RestClient::for_config`] but without requiring a group/version,
    /// for clients that only address absolute paths.
    pub fn unversioned_for_config(config: &RestConfig) -> Result<Self> {
        let codec = config
            .codec
            .clone()
            .ok_or_else(|| Report::new(ClientError::MissingCodec))?;
        let kube_config = config.to_kube_config()?;
        let client = kube::Client::try_from(kube_config).change_context_lazy(|| {
            ClientError::Transport {
                message: format!("failed to create Kubernetes client for {}", config.host),
            }
        })?;

        Ok(Self::new(client, ClientContent {
            api_path: config.api_path.clone(),
            group_version: config.group_version.clone(),
            codec,
            user_agent: config.user_agent.clone(),
            rate_limiter: effective_rate_limiter(config),
        }))
    }

    pub(crate) fn new(client: kube::Client, content: ClientContent) -> Self {
        Self {
            client,
            content: Arc::new(content),
        }
    }

    pub fn get(&self) -> Request {
        self.verb(Method::GET)
    }

    pub fn post(&self) -> Request {
        self.verb(Method::POST)
    }

    pub fn put(&self) -> Request {
        self.verb(Method::PUT)
    }

    pub fn delete(&self) -> Request {
        self.verb(Method::DELETE)
    }

    pub fn patch(&self, patch_type: PatchType) -> Request {
        self.verb(Method::PATCH).content_type(patch_type.content_type())
    }

    pub fn verb(&self, verb: Method) -> Request {
        Request::new(self.clone(), verb)
    }

    pub fn api_path(&self) -> &str {
        &self.content.api_path
    }

    pub fn group_version(&self) -> Option<&GroupVersion> {
        self.content.group_version.as_ref()
    }

    pub fn codec(&self) -> &Codec {
        &self.content.codec
    }

    pub fn user_agent(&self) -> &str {
        &self.content.user_agent
    }

    /// Limiter applied before every request, `None` when throttling is off.
    pub fn rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.content.rate_limiter.as_ref()
    }

    pub(crate) fn kube_client(&self) -> &kube::Client {
        &self.client
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("api_path", &self.content.api_path)
            .field("group_version", &self.content.group_version)
            .field("user_agent", &self.content.user_agent)
            .field("rate_limiter", &self.content.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// A limiter already present in the config wins. Otherwise a token bucket is
/// derived from `qps`/`burst`, with zero meaning the defaults and a negative
/// `qps` disabling throttling.
fn effective_rate_limiter(config: &RestConfig) -> Option<Arc<dyn RateLimiter>> {
    if let Some(limiter) = &config.rate_limiter {
        return Some(Arc::clone(limiter));
    }

    let qps = if config.qps == 0.0 { DEFAULT_QPS } else { config.qps };
    let burst = if config.burst == 0 {
        DEFAULT_BURST
    } else {
        config.burst
    };
    (qps > 0.0).then(|| Arc::new(TokenBucketRateLimiter::new(qps, burst)) as Arc<dyn RateLimiter>)
}
