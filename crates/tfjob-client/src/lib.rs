//! Typed client for the `kubeflow.org/v1alpha2` API group.
//!
//! The [`Clientset`] bundles a [`KubeflowV1alpha2Client`], which hands out
//! namespaced [`TfJobs`] handles, with a [`DiscoveryClient`]. Both are built
//! from one [`RestConfig`] and share its rate limiter.
//!
//! ```no_run
//! # use tfjob_client::{Clientset, ListOptions, RestConfig};
//! # async fn run() -> tfjob_client::Result<()> {
//! let config = RestConfig::infer().await?.with_rate_limits(5.0, 10);
//! let clientset = Clientset::new_for_config(&config)?;
//!
//! let jobs = clientset
//!     .kubeflow_v1alpha2()
//!     .tf_jobs("default")
//!     .list(&ListOptions::default())
//!     .await?;
//! for job in jobs.items {
//!     println!("{:?}", job.metadata.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod clientset;
pub mod config;
pub mod discovery;
pub mod error;
pub mod rate_limit;
pub mod request;
pub mod rest;
pub mod scheme;
pub mod typed;

pub use clientset::Clientset;
pub use clientset::ClientsetExt;
pub use clientset::Interface;
pub use config::RestConfig;
pub use discovery::DiscoveryClient;
pub use error::ClientError;
pub use error::Result;
pub use rate_limit::FakeAlwaysRateLimiter;
pub use rate_limit::RateLimiter;
pub use rate_limit::TokenBucketRateLimiter;
pub use request::DeleteOptions;
pub use request::ListOptions;
pub use request::PatchType;
pub use request::Request;
pub use rest::RestClient;
pub use typed::kubeflow_v1alpha2::KubeflowV1alpha2Client;
pub use typed::kubeflow_v1alpha2::KubeflowV1alpha2ClientExt;
pub use typed::kubeflow_v1alpha2::KubeflowV1alpha2Interface;
pub use typed::kubeflow_v1alpha2::TfJobs;
pub use typed::kubeflow_v1alpha2::TfJobsGetter;
