//! Client for the `kubeflow.org/v1alpha2` group.

mod tfjob;

pub use tfjob::TfJobs;

use crate::config::default_user_agent;
use crate::config::RestConfig;
use crate::error::Result;
use crate::rest::RestClient;
use crate::scheme::codecs;
use crate::scheme::scheme_group_version;

/// Path prefix of every named API group.
pub const API_PATH: &str = "/apis";

/// Hands out TFJob handles scoped to a namespace.
pub trait TfJobsGetter {
    fn tf_jobs(&self, namespace: &str) -> TfJobs;
}

/// Capabilities of the `kubeflow.org/v1alpha2` client.
pub trait KubeflowV1alpha2Interface: TfJobsGetter {
    fn rest_client(&self) -> &RestClient;
}

/// Used to interact with features provided by the `kubeflow.org` group.
#[derive(Debug, Clone)]
pub struct KubeflowV1alpha2Client {
    rest_client: RestClient,
}

impl KubeflowV1alpha2Client {
    /// Build a client for the server described by `config`. The caller's
    /// config is copied before the group defaults are applied.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidHost`](crate::ClientError::InvalidHost) or
    ///   [`ClientError::Transport`](crate::ClientError::Transport) if the
    ///   transport cannot be built
    pub fn new_for_config(config: &RestConfig) -> Result<Self> {
        let mut config = config.clone();
        set_config_defaults(&mut config);
        let rest_client = RestClient::for_config(&config)?;
        Ok(Self::new(rest_client))
    }

    /// Like [`KubeflowV1alpha2Client::new_for_config`] but panics on error.
    pub fn new_for_config_or_die(config: &RestConfig) -> Self {
        match Self::new_for_config(config) {
            Ok(client) => client,
            Err(report) => panic!("{report:?}"),
        }
    }

    /// Wrap a transport that is already fully configured.
    pub fn new(rest_client: RestClient) -> Self {
        Self { rest_client }
    }

    pub fn rest_client(&self) -> &RestClient {
        &self.rest_client
    }

    pub fn tf_jobs(&self, namespace: &str) -> TfJobs {
        TfJobs::new(self.rest_client.clone(), namespace)
    }
}

impl TfJobsGetter for KubeflowV1alpha2Client {
    fn tf_jobs(&self, namespace: &str) -> TfJobs {
        KubeflowV1alpha2Client::tf_jobs(self, namespace)
    }
}

impl KubeflowV1alpha2Interface for KubeflowV1alpha2Client {
    fn rest_client(&self) -> &RestClient {
        KubeflowV1alpha2Client::rest_client(self)
    }
}

/// Accessors that tolerate a missing client.
pub trait KubeflowV1alpha2ClientExt<'a> {
    fn rest_client(self) -> Option<&'a RestClient>;
}

impl<'a> KubeflowV1alpha2ClientExt<'a> for Option<&'a KubeflowV1alpha2Client> {
    fn rest_client(self) -> Option<&'a RestClient> {
        self.map(KubeflowV1alpha2Client::rest_client)
    }
}

/// Point `config` at this group. Only the group/version, API path, codec and
/// an empty user agent are touched, so applying it twice changes nothing.
pub fn set_config_defaults(config: &mut RestConfig) {
    config.group_version = Some(scheme_group_version());
    config.api_path = API_PATH.to_string();
    config.codec = Some(codecs());
    if config.user_agent.is_empty() {
        config.user_agent = default_user_agent();
    }
}
