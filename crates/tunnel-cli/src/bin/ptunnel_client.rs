//! `ptunnel-client`: registers every service in the client config file
//! with its server and relays traffic for each until interrupted.

use std::path::Path;

use clap::Parser;
use tunnel_client::{run_service, ServiceContext};
use tunnel_config::{load_client_config, CommonConfig, DEFAULT_CLIENT_CONFIG_PATH};

/// pTunnelClient is the client application for the tunnel.
#[derive(Parser, Debug)]
#[command(name = "ptunnel-client", version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_CLIENT_CONFIG_PATH)]
    config_file: String,
    #[arg(long)]
    public_key_file: Option<String>,
    #[arg(long = "nbits-file")]
    n_bits_file: Option<String>,
    #[arg(long)]
    server_addr_v4: Option<String>,
    #[arg(long)]
    server_addr_v6: Option<String>,
    #[arg(long)]
    server_port: Option<u16>,
    #[arg(long)]
    server_type: Option<String>,
    #[arg(long)]
    log_file: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    log_max_days: Option<u32>,
    /// NAT type: 0-8 fixed classification, -2 direct, -1 auto-probe via STUN.
    #[arg(long)]
    nat_type: Option<i32>,
    #[arg(long)]
    ssh_private_key_file: Option<String>,
}

fn apply_overrides(common: &mut CommonConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(v) = &args.public_key_file {
        common.public_key_file = Some(v.clone());
    }
    if let Some(v) = &args.n_bits_file {
        common.n_bits_file = Some(v.clone());
    }
    if let Some(v) = &args.server_addr_v4 {
        common.server_addr_v4 = Some(v.clone());
    }
    if let Some(v) = &args.server_addr_v6 {
        common.server_addr_v6 = Some(v.clone());
    }
    if let Some(v) = args.server_port {
        common.server_port = v;
    }
    if let Some(v) = &args.server_type {
        common.server_type = v.clone();
    }
    if let Some(v) = &args.log_file {
        common.log_target = if v.eq_ignore_ascii_case("console") {
            tunnel_config::LogTarget::Console
        } else {
            tunnel_config::LogTarget::File(v.clone())
        };
    }
    if let Some(v) = &args.log_level {
        common.log_level = v.parse().map_err(|e: tunnel_config::ConfigError| anyhow::anyhow!(e))?;
    }
    if let Some(v) = args.log_max_days {
        common.log_max_days = v;
    }
    if let Some(v) = args.nat_type {
        common.nat_type = v;
    }
    if let Some(v) = &args.ssh_private_key_file {
        common.ssh_private_key_file = Some(v.clone());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (mut common, services) = load_client_config(&args.config_file)?;
    apply_overrides(&mut common, &args)?;

    tunnel_cli::logging::init(&common)?;

    let public_key_file = common
        .public_key_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("PublicKeyFile is not specified"))?;
    let server_pubkey = tunnel_crypto::load_public_key(Path::new(&public_key_file))?;

    let nat_type = tunnel_cli::nat::resolve(&common).await?;

    tracing::info!(services = services.len(), "starting client");

    let mut tasks = tokio::task::JoinSet::new();
    for service in services {
        let ctx = ServiceContext {
            common: common.clone(),
            service,
            server_pubkey: server_pubkey.clone(),
            nat_type,
        };
        tasks.spawn(async move { run_service(ctx).await });
    }

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "service ended with an error"),
            Err(e) => tracing::error!(error = %e, "service task panicked"),
        }
    }

    Ok(())
}
