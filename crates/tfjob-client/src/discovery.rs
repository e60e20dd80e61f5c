//! Discovery of the groups, versions and resources an API server supports.

use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroup;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIVersions;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::GroupVersionForDiscovery;
use k8s_openapi::apimachinery::pkg::version::Info;
use tracing::debug;

use crate::config::default_user_agent;
use crate::config::RestConfig;
use crate::error::Result;
use crate::rest::RestClient;
use crate::scheme::meta_codecs;
use crate::scheme::Codec;

/// Path serving the legacy core group.
const LEGACY_PREFIX: &str = "/api";
/// Path serving every named group.
const GROUPS_PREFIX: &str = "/apis";
/// Discovery requests are bounded unless the config sets its own timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(32);

#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    rest_client: RestClient,
    codec: Codec,
}

impl DiscoveryClient {
    /// Build a discovery client for the server described by `config`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidHost`](crate::ClientError::InvalidHost) or
    ///   [`ClientError::Transport`](crate::ClientError::Transport) if the
    ///   transport cannot be built
    pub fn new_for_config(config: &RestConfig) -> Result<Self> {
        let mut config = config.clone();
        set_discovery_defaults(&mut config);
        let rest_client = RestClient::unversioned_for_config(&config)?;
        Ok(Self::new(rest_client))
    }

    /// Like [`DiscoveryClient::new_for_config`] but panics on error.
    pub fn new_for_config_or_die(config: &RestConfig) -> Self {
        match Self::new_for_config(config) {
            Ok(client) => client,
            Err(report) => panic!("{report:?}"),
        }
    }

    /// Wrap an existing transport. Discovery only uses absolute paths, so the
    /// transport may be bound to any group/version.
    pub fn new(rest_client: RestClient) -> Self {
        Self {
            rest_client,
            codec: meta_codecs(),
        }
    }

    pub fn rest_client(&self) -> &RestClient {
        &self.rest_client
    }

    /// List every group the server serves, the legacy core group first.
    ///
    /// A server that forbids or does not serve one of the two discovery
    /// roots is treated as serving no groups under it.
    #[tracing::instrument(skip(self))]
    pub async fn server_groups(&self) -> Result<APIGroupList> {
        let legacy = match self.get::<APIVersions>(LEGACY_PREFIX).await {
            Ok(versions) => Some(versions),
            Err(report) if tolerable(&report) => {
                debug!("legacy API group is not served: {report:?}");
                None
            }
            Err(report) => return Err(report),
        };

        let mut groups = match self.get::<APIGroupList>(GROUPS_PREFIX).await {
            Ok(groups) => groups,
            Err(report) if tolerable(&report) => {
                debug!("named API groups are not served: {report:?}");
                APIGroupList::default()
            }
            Err(report) => return Err(report),
        };

        if let Some(legacy) = legacy.filter(|versions| !versions.versions.is_empty()) {
            groups.groups.insert(0, api_versions_to_api_group(&legacy));
        }
        Ok(groups)
    }

    /// List the resources served under one group/version, `v1` being the
    /// legacy core group.
    #[tracing::instrument(skip(self))]
    pub async fn server_resources_for_group_version(
        &self,
        group_version: &str,
    ) -> Result<APIResourceList> {
        let path = if group_version == "v1" {
            format!("{LEGACY_PREFIX}/v1")
        } else {
            format!("{GROUPS_PREFIX}/{group_version}")
        };

        let mut resources: APIResourceList = self.get(&path).await?;
        if resources.group_version.is_empty() {
            resources.group_version = group_version.to_string();
        }
        Ok(resources)
    }

    #[tracing::instrument(skip(self))]
    pub async fn server_version(&self) -> Result<Info> {
        self.get("/version").await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.rest_client.get().absolute_path(path).send_raw().await?;
        self.codec.decode(body.as_bytes())
    }
}

fn tolerable(report: &error_stack::Report<crate::ClientError>) -> bool {
    let err = report.current_context();
    err.is_not_found() || err.is_forbidden()
}

/// Discovery addresses absolute paths with the meta codec and no group/version.
pub(crate) fn set_discovery_defaults(config: &mut RestConfig) {
    config.api_path = String::new();
    config.group_version = None;
    config.codec = Some(meta_codecs());
    if config.timeout.is_none() {
        config.timeout = Some(DEFAULT_TIMEOUT);
    }
    if config.user_agent.is_empty() {
        config.user_agent = default_user_agent();
    }
}

/// Express the versions of the legacy core group as an unnamed group.
fn api_versions_to_api_group(versions: &APIVersions) -> APIGroup {
    let versions: Vec<GroupVersionForDiscovery> = versions
        .versions
        .iter()
        .map(|version| GroupVersionForDiscovery {
            group_version: version.clone(),
            version: version.clone(),
        })
        .collect();

    APIGroup {
        name: String::new(),
        preferred_version: versions.first().cloned(),
        versions,
        ..Default::default()
    }
}
