use std::{
    io::{self, BufRead},
    net::IpAddr,
    process::ExitCode,
};

use clap::Parser;
use log::{error, info};

use rti_server::{Rti, RtiConfig, DEFAULT_RTI_PORT};

/// Run-time infrastructure server for HLA-style federations
#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1")]
    address: IpAddr,
    /// Port to listen on
    #[clap(long, default_value_t = DEFAULT_RTI_PORT)]
    port: u16,
    /// Log bundler counters for every connection at shutdown
    #[clap(long)]
    metrics: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = RtiConfig::default();
    config.address = (args.address, args.port).into();

    let rti = match Rti::start(config) {
        Ok(rti) => rti,
        Err(error) => {
            error!("{}", error);
            return ExitCode::FAILURE;
        }
    };
    info!("Type x and press enter to stop");
    wait_for_quit();

    if args.metrics {
        rti.log_connection_metrics();
    }
    rti.shutdown();
    ExitCode::SUCCESS
}

fn wait_for_quit() {
    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("x") => return,
            Ok(_) => continue,
            Err(_) => return,
        }
    }
}
