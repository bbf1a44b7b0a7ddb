use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{error, info, warn};

use yafw::config::Config;
use yafw::{api, Firewall, MemorySession};

/// Firewall daemon: programs the kernel ruleset from a declarative
/// configuration and serves the management API.
#[derive(Parser, Debug)]
#[command(name = "yafwd", version, about)]
struct Args {
    /// Configuration file replayed at startup.
    #[arg(long, default_value = "/etc/yafw/config.json")]
    config: PathBuf,

    /// Address the management API listens on.
    #[arg(long, default_value = "127.0.0.1:9085")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !nix::unistd::Uid::effective().is_root() {
        warn!("not running as root, kernel commits will likely be refused");
    }

    // Standalone mode: an in-process emulation stands in for the netlink
    // transport.
    let session = Box::new(MemorySession::new());
    let mut firewall = match Firewall::new(session) {
        Ok(firewall) => firewall,
        Err(err) => {
            error!("cannot initialize the firewall: {}", err);
            std::process::exit(1);
        }
    };

    match Config::load(&args.config) {
        Ok(config) => config.apply(&mut firewall),
        Err(err) => warn!("cannot load {}: {}", args.config.display(), err),
    }

    let shared = Arc::new(Mutex::new(firewall));
    let app = api::router(shared);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("management api listening on {}", args.listen);
    axum::serve(listener, app).await
}
