mod config;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use error_stack::Report;
use serde::Serialize;
use tfjob_client::ClientError;
use tfjob_client::Clientset;
use tfjob_client::DeleteOptions;
use tfjob_client::ListOptions;
use tfjob_client::RestConfig;
use utils::version;

use crate::config::Cli;
use crate::config::Commands;
use crate::config::ConnectionArgs;
use crate::config::DiscoverCommands;
use crate::config::JobsCommands;
use crate::config::NamespaceArgs;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();
    utils::logging::init();

    let cli = Cli::parse();
    tracing::debug!("tfctl {}", &**version::VERSION);

    let config = load_config(&cli.connection).await?;
    let clientset = Clientset::new_for_config(&config).map_err(to_anyhow)?;

    match cli.command {
        Commands::Discover(command) => run_discover(&clientset, command).await,
        Commands::Jobs(command) => run_jobs(&clientset, &config, command).await,
    }
}

async fn load_config(args: &ConnectionArgs) -> Result<RestConfig> {
    let config = match &args.kubeconfig {
        Some(path) => RestConfig::from_kubeconfig_file(path).await,
        None => RestConfig::infer().await,
    }
    .map_err(to_anyhow)
    .context("load Kubernetes configuration failed")?;

    let mut config = config.with_rate_limits(args.qps, args.burst);
    if let Some(user_agent) = &args.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    tracing::debug!(host = %config.host, qps = config.qps, burst = config.burst, "loaded config");
    Ok(config)
}

async fn run_discover(clientset: &Clientset, command: DiscoverCommands) -> Result<()> {
    let discovery = clientset.discovery();
    match command {
        DiscoverCommands::Groups => {
            let groups = discovery.server_groups().await.map_err(to_anyhow)?;
            print_json(&groups)
        }
        DiscoverCommands::Resources { group_version } => {
            let resources = discovery
                .server_resources_for_group_version(&group_version)
                .await
                .map_err(to_anyhow)?;
            print_json(&resources)
        }
        DiscoverCommands::Version => {
            let info = discovery.server_version().await.map_err(to_anyhow)?;
            print_json(&info)
        }
    }
}

async fn run_jobs(clientset: &Clientset, config: &RestConfig, command: JobsCommands) -> Result<()> {
    let client = clientset.kubeflow_v1alpha2();
    match command {
        JobsCommands::List {
            namespace,
            selector,
        } => {
            let mut options = ListOptions::default();
            if let Some(selector) = selector {
                options = options.labels(selector);
            }
            let jobs = client
                .tf_jobs(namespace_or_default(&namespace, config))
                .list(&options)
                .await
                .map_err(to_anyhow)?;
            print_json(&jobs)
        }
        JobsCommands::Get { name, namespace } => {
            let job = client
                .tf_jobs(namespace_or_default(&namespace, config))
                .get(&name)
                .await
                .map_err(to_anyhow)?;
            print_json(&job)
        }
        JobsCommands::Delete { name, namespace } => {
            let status = client
                .tf_jobs(namespace_or_default(&namespace, config))
                .delete(&name, &DeleteOptions::foreground())
                .await
                .map_err(to_anyhow)?;
            print_json(&status)
        }
    }
}

fn namespace_or_default<'a>(args: &'a NamespaceArgs, config: &'a RestConfig) -> &'a str {
    args.namespace
        .as_deref()
        .unwrap_or(config.default_namespace.as_str())
}

/// Keep the whole report stack, `anyhow` only shows the outermost context.
fn to_anyhow(report: Report<ClientError>) -> anyhow::Error {
    anyhow::anyhow!("{report:?}")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize output failed")?;
    println!("{rendered}");
    Ok(())
}
