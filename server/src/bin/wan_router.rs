use std::{
    io::{self, BufRead},
    net::IpAddr,
    process::ExitCode,
};

use clap::Parser;
use log::{error, info};

use rti_server::router::{Router, RouterConfig, DEFAULT_ROUTER_PORT};

/// Relays RTI traffic between hosts on different networks
#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1")]
    address: IpAddr,
    /// Port to listen on
    #[clap(long, default_value_t = DEFAULT_ROUTER_PORT)]
    port: u16,
    /// Append per-host counters to router-metrics.csv
    #[clap(long)]
    metrics: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = RouterConfig {
        address: args.address,
        port: args.port,
        metrics: args.metrics,
        ..RouterConfig::default()
    };
    let router = match Router::start(config) {
        Ok(router) => router,
        Err(error) => {
            error!("{}", error);
            return ExitCode::FAILURE;
        }
    };
    info!("Type x and press enter to stop");

    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("x") => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    router.shutdown();
    ExitCode::SUCCESS
}
