//! # Managed Service Operator
//!
//! Kubernetes operator that keeps externally hosted managed services in line
//! with the custom resources declaring them.
//!
//! Configuration is read from the environment (see `ControllerConfig`); the
//! command-line flags below override individual values.

use anyhow::Result;
use clap::Parser;
use managed_service_operator::config::ControllerConfig;
use managed_service_operator::runtime::{initialization, watch_loop};

/// Managed Service Operator
#[derive(Parser, Debug)]
#[command(name = "managed-service-operator", version, about, long_about = None)]
struct Args {
    /// Port for the metrics and probe server
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Only watch objects in this namespace
    #[arg(long, short = 'n')]
    namespace: Option<String>,

    /// Base URL of the provider REST API
    #[arg(long)]
    provider_api_url: Option<String>,
}

impl Args {
    fn apply(self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(namespace) = self.namespace {
            config.watch_namespace = Some(namespace);
        }
        if let Some(url) = self.provider_api_url {
            config.provider_api_url = url;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.apply(ControllerConfig::from_env());

    let init = initialization::initialize(config).await?;

    watch_loop::run_watch_loop(init.integrations, init.context, init.server_state).await
}
