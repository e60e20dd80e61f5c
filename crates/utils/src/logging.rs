//! provides logging helpers

use tracing::Subscriber;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// stderr formatting layer shared by every binary in the workspace
pub fn get_fmt_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    layer().with_writer(std::io::stderr).with_target(true)
}

/// build the env filter, `RUST_LOG` overrides the default level
pub fn env_filter(default_level: filter::LevelFilter) -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// initiate the global tracing subscriber
pub fn init() {
    let fmt_layer = get_fmt_layer().with_filter(env_filter(filter::LevelFilter::INFO));

    registry().with(fmt_layer).init();
}
