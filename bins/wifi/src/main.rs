//! wifi - WiFi inspection utility
//!
//! Queries and configures wireless devices via nl80211.

mod monitor;
mod output;
mod scan;
mod set;
mod show;

use clap::{Parser, Subcommand};
use nlwifi::Result;
use nlwifi::netlink::TransportConfig;
use nlwifi::nl80211::Nl80211State;

#[derive(Parser)]
#[command(name = "wifi")]
#[command(about = "WiFi inspection utility", long_about = None)]
#[command(version)]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List wireless interfaces
    Dev,

    /// Show radio capabilities
    Phy(show::PhyArgs),

    /// Show associated stations
    Station(show::StationArgs),

    /// Show channel survey data
    Survey(show::IfaceArgs),

    /// Scan for access points
    Scan(scan::ScanArgs),

    /// Watch nl80211 notifications
    Monitor(monitor::MonitorArgs),

    /// Show or set the regulatory domain
    Reg(set::RegArgs),

    /// Show or set transmit power
    Txpower(set::TxPowerArgs),
}

/// Output settings shared by every subcommand.
#[derive(Clone, Copy)]
pub struct Format {
    pub json: bool,
    pub pretty: bool,
}

pub async fn connect() -> Result<Nl80211State> {
    Nl80211State::connect(TransportConfig::default()).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let format = Format {
        json: cli.json,
        pretty: cli.pretty,
    };

    match cli.command {
        Command::Dev => show::run_dev(format).await,
        Command::Phy(args) => show::run_phy(args, format).await,
        Command::Station(args) => show::run_station(args, format).await,
        Command::Survey(args) => show::run_survey(args, format).await,
        Command::Scan(args) => scan::run(args, format).await,
        Command::Monitor(args) => monitor::run(args, format).await,
        Command::Reg(args) => set::run_reg(args, format).await,
        Command::Txpower(args) => set::run_txpower(args, format).await,
    }
}
