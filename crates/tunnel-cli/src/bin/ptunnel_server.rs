//! `ptunnel-server`: accepts control connections and runs one relay per
//! registered client until interrupted.

use std::path::Path;

use clap::Parser;
use tunnel_config::{load_server_config, CommonConfig, DEFAULT_SERVER_CONFIG_PATH};
use tunnel_server::run_server;

/// pTunnelServer is the server application for the tunnel.
#[derive(Parser, Debug)]
#[command(name = "ptunnel-server", version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_SERVER_CONFIG_PATH)]
    config_file: String,
    #[arg(long)]
    private_key_file: Option<String>,
    #[arg(long = "nbits-file")]
    n_bits_file: Option<String>,
    #[arg(long)]
    server_type: Option<String>,
    #[arg(long)]
    server_port: Option<u16>,
    #[arg(long)]
    log_file: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    log_max_days: Option<u32>,
    #[arg(long)]
    heartbeat_timeout: Option<u64>,
    #[arg(long)]
    ssh_port: Option<u16>,
    #[arg(long)]
    ssh_user: Option<String>,
}

fn apply_overrides(common: &mut CommonConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(v) = &args.private_key_file {
        common.private_key_file = Some(v.clone());
    }
    if let Some(v) = &args.n_bits_file {
        common.n_bits_file = Some(v.clone());
    }
    if let Some(v) = &args.server_type {
        common.server_type = v.clone();
    }
    if let Some(v) = args.server_port {
        common.server_port = v;
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
    if let Some(v) = args.heartbeat_timeout {
        common.heartbeat_timeout_secs = v;
    }
    if let Some(v) = args.ssh_port {
        common.ssh_port = Some(v);
    }
    if let Some(v) = &args.ssh_user {
        common.ssh_user = Some(v.clone());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (mut common, services) = load_server_config(&args.config_file)?;
    apply_overrides(&mut common, &args)?;

    tunnel_cli::logging::init(&common)?;

    let private_key_file = common
        .private_key_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("PrivateKeyFile is not specified"))?;
    let private_key = tunnel_crypto::load_private_key(Path::new(&private_key_file))?;

    tracing::info!(services = services.len(), "starting server");

    run_server(common, services, private_key).await?;
    Ok(())
}
