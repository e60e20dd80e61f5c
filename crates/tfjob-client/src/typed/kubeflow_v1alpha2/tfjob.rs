use api_types::TFJob;
use error_stack::Report;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::core::ObjectList;
use tracing::info;

use crate::error::ClientError;
use crate::error::Result;
use crate::request::DeleteOptions;
use crate::request::ListOptions;
use crate::request::PatchType;
use crate::rest::RestClient;

/// Handle for TFJob verbs in one namespace.
#[derive(Debug, Clone)]
pub struct TfJobs {
    client: RestClient,
    ns: String,
}

impl TfJobs {
    pub(super) fn new(client: RestClient, namespace: &str) -> Self {
        Self {
            client,
            ns: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Fetch the TFJob called `name`.
    #[tracing::instrument(skip(self), fields(namespace = %self.ns))]
    pub async fn get(&self, name: &str) -> Result<TFJob> {
        self.client
            .get()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .name(name)
            .send()
            .await
    }

    /// List the TFJobs matching `options`.
    #[tracing::instrument(skip(self), fields(namespace = %self.ns))]
    pub async fn list(&self, options: &ListOptions) -> Result<ObjectList<TFJob>> {
        self.client
            .get()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .list_options(options)
            .send()
            .await
    }

    /// Create `job` and return the object stored by the server.
    #[tracing::instrument(skip(self, job), fields(namespace = %self.ns, name = ?job.metadata.name))]
    pub async fn create(&self, job: &TFJob) -> Result<TFJob> {
        let created: TFJob = self
            .client
            .post()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .body(job)
            .send()
            .await?;
        info!(name = ?created.metadata.name, "created TFJob");
        Ok(created)
    }

    /// Replace the stored object with `job`.
    #[tracing::instrument(skip(self, job), fields(namespace = %self.ns, name = ?job.metadata.name))]
    pub async fn update(&self, job: &TFJob) -> Result<TFJob> {
        let name = object_name(job)?;
        self.client
            .put()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .name(name)
            .body(job)
            .send()
            .await
    }

    /// Replace only the status of the stored object.
    #[tracing::instrument(skip(self, job), fields(namespace = %self.ns, name = ?job.metadata.name))]
    pub async fn update_status(&self, job: &TFJob) -> Result<TFJob> {
        let name = object_name(job)?;
        self.client
            .put()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .name(name)
            .sub_resource("status")
            .body(job)
            .send()
            .await
    }

    #[tracing::instrument(skip(self, options), fields(namespace = %self.ns))]
    pub async fn delete(&self, name: &str, options: &DeleteOptions) -> Result<Status> {
        let status = self
            .client
            .delete()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .name(name)
            .body(options)
            .send_status()
            .await?;
        info!("deleted TFJob");
        Ok(status)
    }

    /// Delete every TFJob matching `list_options`.
    #[tracing::instrument(skip(self, options), fields(namespace = %self.ns))]
    pub async fn delete_collection(
        &self,
        options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<Status> {
        self.client
            .delete()
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .list_options(list_options)
            .body(options)
            .send_status()
            .await
    }

    /// Apply a patch of `patch_type` to the TFJob called `name`.
    #[tracing::instrument(skip(self, data), fields(namespace = %self.ns))]
    pub async fn patch(&self, name: &str, patch_type: PatchType, data: Vec<u8>) -> Result<TFJob> {
        self.client
            .patch(patch_type)
            .namespace(&self.ns)
            .resource(api_types::PLURAL)
            .name(name)
            .raw_body(data)
            .send()
            .await
    }
}

fn object_name(job: &TFJob) -> Result<&str> {
    job.metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            Report::new(ClientError::InvalidObject {
                message: "TFJob has no metadata.name".to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use api_types::TFJobSpec;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn object_name_requires_name() {
        let mut job = TFJob::new("mnist", TFJobSpec::default());
        assert_eq!(object_name(&job).expect("has a name"), "mnist");

        job.metadata.name = None;
        let err = object_name(&job).expect_err("name is missing");
        assert!(matches!(err.current_context(), ClientError::InvalidObject { .. }));

        job.metadata.name = Some(String::new());
        assert!(object_name(&job).is_err());
    }

    #[test(tokio::test)]
    async fn update_without_name_fails_before_sending() {
        let client = crate::KubeflowV1alpha2Client::new_for_config(&crate::RestConfig::new(
            "http://127.0.0.1:9",
        ))
        .expect("should build");
        let mut job = TFJob::new("mnist", TFJobSpec::default());
        job.metadata.name = None;

        let err = client
            .tf_jobs("default")
            .update_status(&job)
            .await
            .expect_err("should fail");
        assert!(matches!(err.current_context(), ClientError::InvalidObject { .. }));
    }
}
