//! Read-only views: interfaces, radios, stations, survey.

use clap::Args;
use nlwifi::nl80211::{Interface, MacAddr, Nl80211State, Station, Wiphy};
use nlwifi::{Error, Result};

use crate::output::{format_bytes, format_mbm, print_json};
use crate::{Format, connect};

#[derive(Args)]
pub struct IfaceArgs {
    /// Interface name
    pub interface: String,
}

#[derive(Args)]
pub struct PhyArgs {
    /// Wiphy index (shows all if omitted)
    pub index: Option<u32>,
}

#[derive(Args)]
pub struct StationArgs {
    /// Interface name
    pub interface: String,

    /// Station MAC address (dumps all if omitted)
    pub mac: Option<MacAddr>,
}

/// Resolve an interface name to its index.
pub async fn ifindex(state: &mut Nl80211State, name: &str) -> Result<u32> {
    state
        .get_interfaces()
        .await?
        .into_iter()
        .find(|i| i.name == name)
        .map(|i| i.ifindex)
        .ok_or_else(|| Error::InvalidArgument(format!("no wireless interface named {}", name)))
}

pub async fn run_dev(format: Format) -> Result<()> {
    let mut state = connect().await?;
    let interfaces = state.get_interfaces().await?;
    if format.json {
        return print_json(&interfaces, format);
    }
    for iface in &interfaces {
        print_interface(iface);
    }
    Ok(())
}

fn print_interface(iface: &Interface) {
    println!("phy#{}", iface.wiphy);
    println!("\tInterface {}", iface.name);
    println!("\t\tifindex {}", iface.ifindex);
    if let Some(wdev) = iface.wdev {
        println!("\t\twdev 0x{:x}", wdev);
    }
    if let Some(mac) = iface.mac {
        println!("\t\taddr {}", mac);
    }
    if let Some(ssid) = &iface.ssid {
        println!("\t\tssid {}", ssid);
    }
    println!("\t\ttype {}", iface.iftype.name());
    if let Some(channel) = &iface.channel {
        println!("\t\tchannel {}", channel);
    }
    if let Some(mbm) = iface.tx_power_mbm {
        println!("\t\ttxpower {}", format_mbm(i64::from(mbm)));
    }
    if iface.four_addr {
        println!("\t\t4addr: on");
    }
}

pub async fn run_phy(args: PhyArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    let wiphys = match args.index {
        Some(index) => vec![state.get_wiphy(index).await?],
        None => state.get_wiphys().await?,
    };
    if format.json {
        return print_json(&wiphys, format);
    }
    for wiphy in &wiphys {
        print_wiphy(wiphy);
    }
    Ok(())
}

fn print_wiphy(wiphy: &Wiphy) {
    println!("Wiphy {} (phy#{})", wiphy.name, wiphy.index);
    println!(
        "\tAntennas: TX {:#x} RX {:#x} (available TX {:#x} RX {:#x})",
        wiphy.antenna_tx, wiphy.antenna_rx, wiphy.antenna_avail_tx, wiphy.antenna_avail_rx
    );
    println!("\tOperating band (estimated): {}", wiphy.operating_band(None));
    let iftypes: Vec<_> = wiphy.iftypes.iter().map(|t| t.name()).collect();
    println!("\tSupported interface modes: {}", iftypes.join(", "));
    let widths: Vec<_> = wiphy.channel_widths().iter().map(|w| w.to_string()).collect();
    println!("\tChannel widths: {}", widths.join(", "));
    let bf = wiphy.beamforming();
    println!(
        "\tBeamforming: SU bfer {} bfee {}, MU bfer {} bfee {}",
        bf.su_beamformer, bf.su_beamformee, bf.mu_beamformer, bf.mu_beamformee
    );
    if wiphy.mlo_support {
        println!("\tMulti-link operation supported");
    }
    for band in &wiphy.bands {
        println!("\tBand {}: {} spatial streams", band.band, band.spatial_streams());
        for ch in &band.channels {
            let mut flags = Vec::new();
            if ch.disabled {
                flags.push("disabled");
            }
            if ch.no_ir {
                flags.push("no IR");
            }
            if ch.radar {
                flags.push("radar detection");
            }
            let power = ch
                .max_tx_power_mbm
                .map(|p| format!(" ({})", format_mbm(i64::from(p))))
                .unwrap_or_default();
            if flags.is_empty() {
                println!("\t\t* {} MHz [{}]{}", ch.freq, ch.channel, power);
            } else {
                println!("\t\t* {} MHz [{}]{} ({})", ch.freq, ch.channel, power, flags.join(", "));
            }
        }
    }
}

pub async fn run_station(args: StationArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    let ifindex = ifindex(&mut state, &args.interface).await?;
    let stations = match args.mac {
        Some(mac) => vec![state.get_station(ifindex, Some(mac)).await?],
        None => state.get_stations(ifindex).await?,
    };
    if format.json {
        return print_json(&stations, format);
    }
    for sta in &stations {
        print_station(sta, &args.interface);
    }
    Ok(())
}

fn print_station(sta: &Station, ifname: &str) {
    println!("Station {} (on {})", sta.mac, ifname);
    if let Some(ms) = sta.inactive_ms {
        println!("\tinactive time:\t{} ms", ms);
    }
    println!("\trx bytes:\t{} ({})", sta.rx_bytes, format_bytes(sta.rx_bytes));
    println!("\trx packets:\t{}", sta.rx_packets);
    println!("\ttx bytes:\t{} ({})", sta.tx_bytes, format_bytes(sta.tx_bytes));
    println!("\ttx packets:\t{}", sta.tx_packets);
    println!("\ttx retries:\t{}", sta.tx_retries);
    println!("\ttx failed:\t{}", sta.tx_failed);
    if let Some(signal) = sta.signal_dbm {
        println!("\tsignal:\t\t{} dBm", signal);
    }
    if let Some(avg) = sta.signal_avg_dbm {
        println!("\tsignal avg:\t{} dBm", avg);
    }
    if let Some(rate) = &sta.tx_bitrate {
        println!("\ttx bitrate:\t{:.1} MBit/s", rate.mbps());
    }
    if let Some(rate) = &sta.rx_bitrate {
        println!("\trx bitrate:\t{:.1} MBit/s", rate.mbps());
    }
    if let Some(secs) = sta.connected_secs {
        println!("\tconnected time:\t{} seconds", secs);
    }
}

pub async fn run_survey(args: IfaceArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    let ifindex = ifindex(&mut state, &args.interface).await?;
    let survey = state.get_survey(ifindex).await?;
    if format.json {
        return print_json(&survey, format);
    }
    for info in &survey {
        let in_use = if info.in_use { " [in use]" } else { "" };
        println!("Survey data from {}", args.interface);
        println!("\tfrequency:\t{} MHz{}", info.freq, in_use);
        if let Some(noise) = info.noise_dbm {
            println!("\tnoise:\t\t{} dBm", noise);
        }
        if let Some(time) = info.time {
            println!("\tactive time:\t{} ms", time);
        }
        if let Some(busy) = info.time_busy {
            println!("\tbusy time:\t{} ms", busy);
        }
        if let Some(load) = info.load() {
            println!("\tchannel load:\t{}%", load);
        }
    }
    Ok(())
}
