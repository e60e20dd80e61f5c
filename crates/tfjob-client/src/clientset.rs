//! Aggregate client holding one client per served group/version plus
//! discovery.

use std::sync::Arc;

use tracing::error;

use crate::config::RestConfig;
use crate::discovery::DiscoveryClient;
use crate::error::Result;
use crate::rate_limit::RateLimiter;
use crate::rate_limit::TokenBucketRateLimiter;
use crate::rest::RestClient;
use crate::typed::kubeflow_v1alpha2::KubeflowV1alpha2Client;

/// Capabilities of a [`Clientset`].
pub trait Interface {
    fn discovery(&self) -> &DiscoveryClient;

    fn kubeflow_v1alpha2(&self) -> &KubeflowV1alpha2Client;

    #[deprecated(note = "explicitly pick a version with `kubeflow_v1alpha2`")]
    fn kubeflow(&self) -> &KubeflowV1alpha2Client;
}

/// Clients for every group. Each group has exactly one version included.
#[derive(Debug, Clone)]
pub struct Clientset {
    discovery: DiscoveryClient,
    kubeflow_v1alpha2: KubeflowV1alpha2Client,
}

impl Clientset {
    /// Build a clientset for the server described by `config`.
    ///
    /// When `config` asks for a positive `qps` and carries no limiter, a
    /// token bucket sized from `qps`/`burst` is installed and shared by every
    /// sub-client. The caller's config is never modified.
    ///
    /// # Errors
    ///
    /// Fails without returning a partial clientset if either sub-client
    /// cannot be built.
    pub fn new_for_config(config: &RestConfig) -> Result<Self> {
        let mut config = config.clone();
        if config.rate_limiter.is_none() && config.qps > 0.0 {
            config.rate_limiter = Some(
                Arc::new(TokenBucketRateLimiter::new(config.qps, config.burst)) as Arc<dyn RateLimiter>,
            );
        }

        let kubeflow_v1alpha2 = KubeflowV1alpha2Client::new_for_config(&config)?;
        let discovery = DiscoveryClient::new_for_config(&config).inspect_err(|report| {
            error!("failed to create the DiscoveryClient: {report:?}");
        })?;

        Ok(Self {
            discovery,
            kubeflow_v1alpha2,
        })
    }

    /// Like [`Clientset::new_for_config`] but panics if the config is unusable.
    pub fn new_for_config_or_die(config: &RestConfig) -> Self {
        match Self::new_for_config(config) {
            Ok(clientset) => clientset,
            Err(report) => panic!("{report:?}"),
        }
    }

    /// Build every sub-client on top of one existing transport.
    pub fn new(rest_client: RestClient) -> Self {
        Self {
            discovery: DiscoveryClient::new(rest_client.clone()),
            kubeflow_v1alpha2: KubeflowV1alpha2Client::new(rest_client),
        }
    }

    pub fn kubeflow_v1alpha2(&self) -> &KubeflowV1alpha2Client {
        &self.kubeflow_v1alpha2
    }

    /// Default version of the kubeflow group.
    #[deprecated(note = "explicitly pick a version with `kubeflow_v1alpha2`")]
    pub fn kubeflow(&self) -> &KubeflowV1alpha2Client {
        self.kubeflow_v1alpha2()
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }
}

impl Interface for Clientset {
    fn discovery(&self) -> &DiscoveryClient {
        Clientset::discovery(self)
    }

    fn kubeflow_v1alpha2(&self) -> &KubeflowV1alpha2Client {
        Clientset::kubeflow_v1alpha2(self)
    }

    fn kubeflow(&self) -> &KubeflowV1alpha2Client {
        Clientset::kubeflow_v1alpha2(self)
    }
}

/// Accessors that tolerate a missing clientset.
pub trait ClientsetExt<'a> {
    fn discovery(self) -> Option<&'a DiscoveryClient>;
}

impl<'a> ClientsetExt<'a> for Option<&'a Clientset> {
    fn discovery(self) -> Option<&'a DiscoveryClient> {
        self.map(Clientset::discovery)
    }
}
