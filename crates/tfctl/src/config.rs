use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tfjob_client::config::DEFAULT_BURST;
use tfjob_client::config::DEFAULT_QPS;
use utils::version;

#[derive(Parser, Debug)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// How to reach the API server
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Path to a kubeconfig file, the in-cluster config or the default
    /// kubeconfig is used when unset
    #[arg(long, global = true, env = "KUBECONFIG", value_hint = clap::ValueHint::FilePath)]
    pub kubeconfig: Option<PathBuf>,

    /// Client side requests per second, a negative value disables throttling
    #[arg(long, global = true, default_value_t = DEFAULT_QPS, allow_negative_numbers = true)]
    pub qps: f32,

    /// Requests admitted in a burst above `--qps`
    #[arg(long, global = true, default_value_t = DEFAULT_BURST)]
    pub burst: u32,

    /// User agent sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query what the API server serves
    #[command(subcommand)]
    Discover(DiscoverCommands),
    /// Manage TFJobs
    #[command(subcommand)]
    Jobs(JobsCommands),
}

#[derive(Subcommand, Debug)]
pub enum DiscoverCommands {
    /// List every API group
    Groups,
    /// List the resources of one group/version, e.g. `kubeflow.org/v1alpha2`
    Resources { group_version: String },
    /// Show the server version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommands {
    /// List TFJobs
    List {
        #[command(flatten)]
        namespace: NamespaceArgs,
        /// Label selector, e.g. `app=mnist`
        #[arg(short = 'l', long)]
        selector: Option<String>,
    },
    /// Show one TFJob
    Get {
        name: String,
        #[command(flatten)]
        namespace: NamespaceArgs,
    },
    /// Delete one TFJob and its pods
    Delete {
        name: String,
        #[command(flatten)]
        namespace: NamespaceArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct NamespaceArgs {
    /// Namespace of the TFJobs, defaults to the kubeconfig context namespace
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,
}
