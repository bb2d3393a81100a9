//! Regulatory domain and transmit power.

use clap::{Args, Subcommand};
use nlwifi::Result;
use nlwifi::nl80211::{RegDomain, TxPowerSetting};

use crate::output::{format_mbm, print_json};
use crate::show::ifindex;
use crate::{Format, connect};

#[derive(Args)]
pub struct RegArgs {
    #[command(subcommand)]
    pub action: Option<RegAction>,
}

#[derive(Subcommand)]
pub enum RegAction {
    /// Show the regulatory domain
    Get {
        /// Wiphy with a self-managed domain
        #[arg(long)]
        phy: Option<u32>,
    },
    /// Request a regulatory domain
    Set {
        /// ISO 3166 alpha2 code, or 00 for world
        alpha2: String,
    },
}

#[derive(Args)]
pub struct TxPowerArgs {
    /// Interface name
    pub interface: String,

    /// New setting: auto, limit or fixed (shows current if omitted)
    #[arg(value_parser = ["auto", "limit", "fixed"])]
    pub mode: Option<String>,

    /// Level in mBm for limit and fixed
    #[arg(required_if_eq_any = [("mode", "limit"), ("mode", "fixed")])]
    pub mbm: Option<u32>,
}

pub async fn run_reg(args: RegArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    match args.action.unwrap_or(RegAction::Get { phy: None }) {
        RegAction::Get { phy } => {
            let reg = state.get_reg_domain(phy).await?;
            if format.json {
                return print_json(&reg, format);
            }
            print_reg(&reg);
        }
        RegAction::Set { alpha2 } => {
            state.set_reg_domain(&alpha2.to_ascii_uppercase()).await?;
        }
    }
    Ok(())
}

fn print_reg(reg: &RegDomain) {
    match reg.wiphy {
        Some(wiphy) => println!("phy#{} (self-managed)", wiphy),
        None => println!("global"),
    }
    println!("country {}:", reg.alpha2);
    for rule in &reg.rules {
        let cac = rule
            .dfs_cac_ms
            .map(|ms| format!(", CAC {} ms", ms))
            .unwrap_or_default();
        println!(
            "\t({} - {} @ {}), ({}){}",
            rule.start_khz / 1000,
            rule.end_khz / 1000,
            rule.max_bandwidth_khz / 1000,
            format_mbm(i64::from(rule.max_eirp_mbm)),
            cac
        );
    }
}

pub async fn run_txpower(args: TxPowerArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    let ifindex = ifindex(&mut state, &args.interface).await?;

    let setting = match (args.mode.as_deref(), args.mbm) {
        (None, _) => None,
        (Some("auto"), _) => Some(TxPowerSetting::Automatic),
        (Some("limit"), Some(mbm)) => Some(TxPowerSetting::Limited(mbm)),
        (Some(_), Some(mbm)) => Some(TxPowerSetting::Fixed(mbm)),
        (Some(mode), None) => {
            return Err(nlwifi::Error::InvalidArgument(format!("{} needs a level", mode)));
        }
    };

    match setting {
        Some(setting) => {
            let wiphy = state.get_interface(ifindex).await?.wiphy;
            state.set_tx_power(wiphy, setting).await
        }
        None => {
            let level = state.get_tx_power(ifindex).await?;
            if format.json {
                return print_json(&level, format);
            }
            match level {
                Some(mbm) => println!("{}: {}", args.interface, format_mbm(i64::from(mbm))),
                None => println!("{}: unknown", args.interface),
            }
            Ok(())
        }
    }
}
