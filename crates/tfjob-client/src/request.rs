//! Request builder used by the typed and discovery clients.
//!
//! A [`Request`] collects the path segments, query parameters and body of one
//! API call and sends it through the owning [`RestClient`]:
//!
//! ```no_run
//! # use tfjob_client::RestClient;
//! # async fn run(client: RestClient) -> tfjob_client::Result<()> {
//! let job: api_types::TFJob = client
//!     .get()
//!     .namespace("team-a")
//!     .resource("tfjobs")
//!     .name("mnist")
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use http::header;
use http::Method;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::error::Result;
use crate::rate_limit;
use crate::rest::RestClient;

/// Patch flavours accepted by the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    Json,
    Merge,
    StrategicMerge,
}

impl PatchType {
    pub fn content_type(self) -> &'static str {
        match self {
            PatchType::Json => "application/json-patch+json",
            PatchType::Merge => "application/merge-patch+json",
            PatchType::StrategicMerge => "application/strategic-merge-patch+json",
        }
    }
}

/// Options shared by list and delete-collection calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub resource_version: Option<String>,
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
    pub timeout_seconds: Option<u32>,
}

impl ListOptions {
    pub fn labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query parameters in API server naming.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(selector) = &self.label_selector {
            params.push(("labelSelector", selector.clone()));
        }
        if let Some(selector) = &self.field_selector {
            params.push(("fieldSelector", selector.clone()));
        }
        if let Some(version) = &self.resource_version {
            params.push(("resourceVersion", version.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(token) = &self.continue_token {
            params.push(("continue", token.clone()));
        }
        if let Some(timeout) = self.timeout_seconds {
            params.push(("timeoutSeconds", timeout.to_string()));
        }
        params
    }
}

/// Body of delete calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<i64>,
    /// One of `Orphan`, `Background` or `Foreground`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<String>,
}

impl DeleteOptions {
    pub fn background() -> Self {
        Self {
            propagation_policy: Some("Background".to_string()),
            ..Default::default()
        }
    }

    pub fn foreground() -> Self {
        Self {
            propagation_policy: Some("Foreground".to_string()),
            ..Default::default()
        }
    }
}

/// One API call under construction.
///
/// Builder errors, such as a body that fails to encode, are kept until the
/// request is sent.
#[derive(Debug)]
pub struct Request {
    client: RestClient,
    verb: Method,
    absolute_path: Option<String>,
    namespace: Option<String>,
    resource: Option<String>,
    name: Option<String>,
    sub_resource: Option<String>,
    params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<&'static str>,
    timeout: Option<Duration>,
    error: Option<Report<ClientError>>,
}

impl Request {
    pub(crate) fn new(client: RestClient, verb: Method) -> Self {
        Self {
            client,
            verb,
            absolute_path: None,
            namespace: None,
            resource: None,
            name: None,
            sub_resource: None,
            params: Vec::new(),
            body: None,
            content_type: None,
            timeout: None,
            error: None,
        }
    }

    /// Address `path` directly, ignoring the client's API path and
    /// group/version.
    pub fn absolute_path(mut self, path: impl Into<String>) -> Self {
        self.absolute_path = Some(path.into());
        self
    }

    /// Empty namespaces address cluster-wide collections.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sub_resource(mut self, sub_resource: impl Into<String>) -> Self {
        self.sub_resource = Some(sub_resource.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn list_options(mut self, options: &ListOptions) -> Self {
        self.params.extend(
            options
                .to_params()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value)),
        );
        self
    }

    /// Encode `object` with the client's codec.
    pub fn body<T: Serialize>(mut self, object: &T) -> Self {
        match self.client.codec().encode(object) {
            Ok(body) => self.body = Some(body),
            Err(report) => self.error = Some(report),
        }
        self
    }

    /// Use `body` as is, for patches.
    pub fn raw_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Bound the call on the server side and on the client side.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Path and query of the request.
    pub fn url(&self) -> String {
        let mut path = match &self.absolute_path {
            Some(path) => path.clone(),
            None => self.relative_path(),
        };
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            query.append_pair(key, value);
        }
        if let Some(seconds) = self.timeout.map(server_timeout_seconds) {
            query.append_pair("timeout", &format!("{seconds}s"));
        }
        let query = query.finish();

        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }

    fn relative_path(&self) -> String {
        let mut segments: Vec<&str> = Vec::new();
        segments.extend(split_path(self.client.api_path()));
        if let Some(gv) = self.client.group_version() {
            segments.extend(split_path(&gv.group));
            segments.extend(split_path(&gv.version));
        }
        if let Some(namespace) = &self.namespace {
            if self.resource.is_some() {
                segments.push("namespaces");
                segments.push(namespace);
            }
        }
        for segment in [&self.resource, &self.name, &self.sub_resource]
            .into_iter()
            .flatten()
        {
            segments.push(segment);
        }
        format!("/{}", segments.join("/"))
    }

    /// Send the request and decode the response with the client's codec.
    pub async fn send<T: DeserializeOwned>(self) -> Result<T> {
        let codec = self.client.codec().clone();
        let body = self.send_raw().await?;
        codec.decode(body.as_bytes())
    }

    /// Send the request and reduce the response to a `Status`.
    ///
    /// Deletes answer with either a `Status` or the deleted object. The
    /// latter, like an empty body, counts as success.
    pub async fn send_status(self) -> Result<Status> {
        let body = self.send_raw().await?;
        if body.trim().is_empty() {
            return Ok(success_status());
        }

        let value: Value = serde_json::from_str(&body)
            .change_context_lazy(|| ClientError::decode("response body is not valid JSON"))?;
        if value.get("kind").and_then(Value::as_str) == Some("Status") {
            serde_json::from_value(value)
                .change_context_lazy(|| ClientError::decode("response is not a valid Status"))
        } else {
            Ok(success_status())
        }
    }

    /// Send the request and return the response body undecoded.
    pub async fn send_raw(mut self) -> Result<String> {
        if let Some(report) = self.error.take() {
            return Err(report);
        }

        let uri = self.url();
        let request = self.build_http_request(&uri)?;

        if let Some(limiter) = self.client.rate_limiter() {
            rate_limit::accept(limiter.as_ref()).await;
        }

        debug!(verb = %self.verb, uri = %uri, "sending request");
        let response = self.client.kube_client().request_text(request);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, response)
                .await
                .map_err(|_| {
                    Report::new(ClientError::Timeout {
                        seconds: timeout.as_secs(),
                    })
                })?,
            None => response.await,
        };

        result.map_err(|err| {
            let context = ClientError::from(err);
            debug!(verb = %self.verb, uri = %uri, error = %context, "request failed");
            Report::new(context)
        })
    }

    fn build_http_request(&self, uri: &str) -> Result<http::Request<Vec<u8>>> {
        let codec = self.client.codec();
        let mut builder = http::Request::builder()
            .method(self.verb.clone())
            .uri(uri)
            .header(header::ACCEPT, codec.content_type());
        if !self.client.user_agent().is_empty() {
            builder = builder.header(header::USER_AGENT, self.client.user_agent());
        }
        if self.body.is_some() {
            builder = builder.header(
                header::CONTENT_TYPE,
                self.content_type.unwrap_or(codec.content_type()),
            );
        }

        builder
            .body(self.body.clone().unwrap_or_default())
            .change_context_lazy(|| ClientError::request(format!("invalid request for {uri}")))
    }
}

/// Whole seconds sent to the server, rounded up so a sub-second timeout
/// never becomes `0s`, which the server reads as no timeout.
fn server_timeout_seconds(timeout: Duration) -> u64 {
    let seconds = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        seconds.saturating_add(1)
    } else {
        seconds
    }
}

fn success_status() -> Status {
    Status {
        status: Some("Success".to_string()),
        ..Default::default()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::config::RestConfig;
    use crate::scheme::codecs;
    use crate::scheme::scheme_group_version;

    fn client() -> RestClient {
        let mut config = RestConfig::new("http://localhost:8080");
        config.api_path = "/apis".to_string();
        config.group_version = Some(scheme_group_version());
        config.codec = Some(codecs());
        RestClient::for_config(&config).expect("should build client")
    }

    #[test(tokio::test)]
    async fn namespaced_resource_url() {
        let request = client()
            .get()
            .namespace("team-a")
            .resource("tfjobs")
            .name("mnist");

        assert_eq!(
            request.url().as_str(),
            "/apis/kubeflow.org/v1alpha2/namespaces/team-a/tfjobs/mnist"
        );
    }

    #[test(tokio::test)]
    async fn resource_is_passed_through_unchanged() {
        let request = client().get().namespace("team-a").resource("TFJobs");

        assert_eq!(
            request.url().as_str(),
            "/apis/kubeflow.org/v1alpha2/namespaces/team-a/TFJobs"
        );
    }

    #[test(tokio::test)]
    async fn sub_second_timeout_rounds_up() {
        let request = client()
            .get()
            .absolute_path("/version")
            .timeout(Duration::from_millis(100));

        assert_eq!(request.url().as_str(), "/version?timeout=1s");
    }

    #[test]
    fn server_timeout_seconds_rounding() {
        assert_eq!(server_timeout_seconds(Duration::from_secs(30)), 30);
        assert_eq!(server_timeout_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(server_timeout_seconds(Duration::from_nanos(1)), 1);
        assert_eq!(server_timeout_seconds(Duration::ZERO), 0);
    }

    #[test(tokio::test)]
    async fn empty_namespace_is_omitted() {
        let request = client().get().namespace("").resource("tfjobs");

        assert_eq!(request.url().as_str(), "/apis/kubeflow.org/v1alpha2/tfjobs");
    }

    #[test(tokio::test)]
    async fn sub_resource_and_query() {
        let options = ListOptions::default().labels("app=mnist").limit(50);
        let request = client()
            .put()
            .namespace("team-a")
            .resource("tfjobs")
            .name("mnist")
            .sub_resource("status")
            .list_options(&options)
            .timeout(Duration::from_secs(30));

        assert_eq!(
            request.url().as_str(),
            "/apis/kubeflow.org/v1alpha2/namespaces/team-a/tfjobs/mnist/status\
             ?labelSelector=app%3Dmnist&limit=50&timeout=30s"
        );
    }

    #[test(tokio::test)]
    async fn absolute_path_ignores_group_version() {
        let request = client().get().absolute_path("/version");

        assert_eq!(request.url().as_str(), "/version");
    }

    #[test(tokio::test)]
    async fn body_encode_error_is_reported_on_send() {
        let unregistered = serde_json::json!({ "apiVersion": "v1", "kind": "Pod" });
        let request = client().post().resource("tfjobs").body(&unregistered);

        let err = request
            .send_raw()
            .await
            .expect_err("encode error should surface");
        assert!(matches!(err.current_context(), ClientError::Encode { .. }));
    }

    #[test(tokio::test)]
    async fn http_request_carries_headers() {
        let request = client()
            .patch(PatchType::Merge)
            .namespace("team-a")
            .resource("tfjobs")
            .name("mnist")
            .raw_body(br#"{"spec":{}}"#.to_vec());

        let http_request = request
            .build_http_request(&request.url())
            .expect("should build");
        assert_eq!(http_request.method(), &Method::PATCH);
        assert_eq!(
            http_request.headers()[header::CONTENT_TYPE].to_str().ok(),
            Some("application/merge-patch+json")
        );
        assert_eq!(
            http_request.headers()[header::ACCEPT].to_str().ok(),
            Some("application/json")
        );
        assert_eq!(http_request.body().as_slice(), &br#"{"spec":{}}"#[..]);
    }

    #[test]
    fn list_options_params() {
        let options = ListOptions {
            field_selector: Some("metadata.name=mnist".to_string()),
            resource_version: Some("42".to_string()),
            continue_token: Some("abc".to_string()),
            timeout_seconds: Some(10),
            ..Default::default()
        };

        assert_eq!(options.to_params(), vec![
            ("fieldSelector", "metadata.name=mnist".to_string()),
            ("resourceVersion", "42".to_string()),
            ("continue", "abc".to_string()),
            ("timeoutSeconds", "10".to_string()),
        ]);
    }

    #[test]
    fn delete_options_serialize_in_api_naming() {
        let options = DeleteOptions {
            grace_period_seconds: Some(0),
            ..DeleteOptions::foreground()
        };

        assert_eq!(
            serde_json::to_value(&options).expect("serializable"),
            serde_json::json!({ "gracePeriodSeconds": 0, "propagationPolicy": "Foreground" })
        );
    }
}
