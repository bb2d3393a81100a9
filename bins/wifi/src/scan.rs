//! Scan command.

use std::time::Duration;

use clap::Args;
use nlwifi::nl80211::{Bss, EventKind, ScanRequest, Scope, event_channel};
use nlwifi::{Error, Result};

use crate::output::print_json;
use crate::show::ifindex;
use crate::{Format, connect};

#[derive(Args)]
pub struct ScanArgs {
    /// Interface name
    pub interface: String,

    /// Print cached results without scanning
    #[arg(long)]
    pub dump: bool,

    /// Passive scan (no probe requests)
    #[arg(long, conflicts_with = "ssid")]
    pub passive: bool,

    /// SSID to probe for (repeatable)
    #[arg(long)]
    pub ssid: Vec<String>,

    /// Frequency in MHz to scan (repeatable)
    #[arg(long)]
    pub freq: Vec<u32>,

    /// Flush cached results first
    #[arg(long)]
    pub flush: bool,

    /// Seconds to wait for completion
    #[arg(long, default_value_t = 30)]
    pub wait: u64,
}

impl ScanArgs {
    fn request(&self) -> ScanRequest {
        let mut request = if self.passive {
            ScanRequest::passive()
        } else {
            ScanRequest::new()
        };
        for ssid in &self.ssid {
            request = request.ssid(ssid.as_bytes());
        }
        request = request.freqs(self.freq.iter().copied());
        if self.flush {
            request = request.flush();
        }
        request
    }
}

pub async fn run(args: ScanArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;
    let ifindex = ifindex(&mut state, &args.interface).await?;

    if !args.dump {
        let (listener, events) = event_channel(
            Scope::Device(ifindex),
            &[EventKind::ScanResults, EventKind::ScanAborted],
        );
        let id = state.add_listener(listener);
        let mut events = events.into_inner();

        state.trigger_scan(ifindex, &args.request()).await?;
        let wait = async {
            loop {
                state.dispatch_once().await?;
                if let Ok(event) = events.try_recv() {
                    return Ok::<_, Error>(event.kind);
                }
            }
        };
        let kind = tokio::time::timeout(Duration::from_secs(args.wait), wait)
            .await
            .map_err(|_| Error::InvalidArgument(format!("scan did not finish within {}s", args.wait)))??;
        state.remove_listener(id);
        if kind == EventKind::ScanAborted {
            eprintln!("scan aborted; showing cached results");
        }
    }

    let results = state.get_scan_results(ifindex).await?;
    if format.json {
        return print_json(&results, format);
    }
    for bss in &results {
        print_bss(bss, &args.interface);
    }
    Ok(())
}

fn print_bss(bss: &Bss, ifname: &str) {
    println!("BSS {} (on {})", bss.bssid, ifname);
    println!("\tfreq: {} (channel {})", bss.freq, bss.channel);
    if let Some(interval) = bss.beacon_interval {
        println!("\tbeacon interval: {} TUs", interval);
    }
    if let Some(capability) = bss.capability {
        println!("\tcapability: {:#06x}", capability);
    }
    if let Some(signal) = bss.signal_dbm() {
        println!("\tsignal: {:.2} dBm", signal);
    }
    if let Some(age) = bss.seen_ms_ago {
        println!("\tlast seen: {} ms ago", age);
    }
    if let Some(ssid) = &bss.ssid {
        println!("\tSSID: {}", ssid);
    }
}
