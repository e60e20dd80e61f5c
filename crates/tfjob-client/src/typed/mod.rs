//! Group-versioned clients, one module per served group/version.

pub mod kubeflow_v1alpha2;
