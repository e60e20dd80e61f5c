//! Scheme registry and JSON codec.
//!
//! A [`Scheme`] records which kinds a client understands. The [`Codec`]
//! built on top of it encodes request bodies and decodes responses,
//! rejecting objects whose `apiVersion`/`kind` pair is not registered.

use std::collections::HashSet;
use std::sync::Arc;

use api_types::TFJob;
use error_stack::Report;
use error_stack::ResultExt;
use kube::core::GroupVersion;
use kube::core::GroupVersionKind;
use kube::Resource;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::error::Result;

/// Content type negotiated with the API server.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Kinds registered for the TFJob group.
pub static SCHEME: Lazy<Arc<Scheme>> = Lazy::new(|| {
    let mut scheme = Scheme::new();
    add_to_scheme(&mut scheme);
    Arc::new(scheme)
});

/// Kinds returned by the discovery endpoints.
pub static META_SCHEME: Lazy<Arc<Scheme>> = Lazy::new(|| {
    let mut scheme = Scheme::new();
    for kind in ["APIGroupList", "APIGroup", "APIResourceList", "APIVersions", "Status"] {
        scheme.add_known_kind(GroupVersionKind::gvk("", "v1", kind));
    }
    Arc::new(scheme)
});

/// Group and version served by this client.
pub fn scheme_group_version() -> GroupVersion {
    GroupVersion::gv(api_types::GROUP, api_types::VERSION)
}

/// Register every kind of the `kubeflow.org/v1alpha2` group.
pub fn add_to_scheme(scheme: &mut Scheme) {
    scheme.add_known_type::<TFJob>();
}

/// Codec for the TFJob group.
pub fn codecs() -> Codec {
    Codec::new(Arc::clone(&SCHEME))
}

/// Codec for discovery responses.
pub fn meta_codecs() -> Codec {
    Codec::new(Arc::clone(&META_SCHEME))
}

#[derive(Debug, Default, Clone)]
pub struct Scheme {
    known: HashSet<GroupVersionKind>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_known_kind(&mut self, gvk: GroupVersionKind) -> &mut Self {
        self.known.insert(gvk);
        self
    }

    /// Register a resource type together with its list kind.
    pub fn add_known_type<K>(&mut self) -> &mut Self
    where
        K: Resource<DynamicType = ()>,
    {
        let group = K::group(&());
        let version = K::version(&());
        let kind = K::kind(&());
        self.add_known_kind(GroupVersionKind::gvk(&group, &version, &kind));
        self.add_known_kind(GroupVersionKind::gvk(&group, &version, &format!("{kind}List")))
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.known.contains(gvk)
    }

    pub fn known_kinds(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.known.iter()
    }
}

/// JSON codec bound to a scheme.
#[derive(Debug, Clone)]
pub struct Codec {
    scheme: Arc<Scheme>,
}

impl Codec {
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme }
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn encode<T: Serialize>(&self, object: &T) -> Result<Vec<u8>> {
        let value = serde_json::to_value(object)
            .change_context_lazy(|| ClientError::encode("object is not serializable"))?;
        self.check_kind(&value).map_err(|report| {
            let message = report.current_context().to_string();
            report.change_context(ClientError::encode(message))
        })?;
        serde_json::to_vec(&value).change_context_lazy(|| ClientError::encode("object is not serializable"))
    }

    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T> {
        let value: Value = serde_json::from_slice(body)
            .change_context_lazy(|| ClientError::decode("response body is not valid JSON"))?;
        self.check_kind(&value)?;
        serde_json::from_value(value)
            .change_context_lazy(|| ClientError::decode("response does not match the expected type"))
    }

    /// Objects without type metadata pass through, objects carrying an
    /// unregistered `apiVersion`/`kind` pair are rejected.
    fn check_kind(&self, value: &Value) -> Result<()> {
        let api_version = value.get("apiVersion").and_then(Value::as_str);
        let kind = value.get("kind").and_then(Value::as_str);
        let (Some(api_version), Some(kind)) = (api_version, kind) else {
            return Ok(());
        };

        let gvk = parse_gvk(api_version, kind);
        if self.scheme.recognizes(&gvk) {
            Ok(())
        } else {
            Err(Report::new(ClientError::decode(format!(
                "no kind \"{kind}\" is registered for version \"{api_version}\""
            ))))
        }
    }
}

/// Split an `apiVersion` such as `apps/v1` or `v1` into its parts.
fn parse_gvk(api_version: &str, kind: &str) -> GroupVersionKind {
    match api_version.split_once('/') {
        Some((group, version)) => GroupVersionKind::gvk(group, version, kind),
        None => GroupVersionKind::gvk("", api_version, kind),
    }
}
