//! wifi monitor - watch nl80211 notifications.

use clap::{Args, ValueEnum};
use nlwifi::Result;
use nlwifi::nl80211::{EventKind, EventPayload, Scope, WifiEvent, event_channel};
use tokio_stream::StreamExt;

use crate::output::print_json;
use crate::show::ifindex;
use crate::{Format, connect};

/// Event classes that can be monitored.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EventClass {
    /// Radio and interface creation, removal and changes.
    Config,
    /// Scan start, completion and abort.
    Scan,
    /// Stations, connects, disconnects and management frames.
    Mlme,
    /// Regulatory domain changes.
    Reg,
    /// Channel switches and radar.
    Channel,
    /// Vendor events.
    Vendor,
    /// Everything.
    All,
}

impl EventClass {
    fn kinds(self) -> &'static [EventKind] {
        match self {
            EventClass::Config => &[
                EventKind::WiphyNew,
                EventKind::WiphyDel,
                EventKind::InterfaceNew,
                EventKind::InterfaceDel,
                EventKind::InterfaceChanged,
            ],
            EventClass::Scan => &[
                EventKind::ScanStarted,
                EventKind::ScanResults,
                EventKind::ScanAborted,
            ],
            EventClass::Mlme => &[
                EventKind::StationNew,
                EventKind::StationDel,
                EventKind::Connect,
                EventKind::Disconnect,
                EventKind::MgmtFrame,
            ],
            EventClass::Reg => &[EventKind::RegChange],
            EventClass::Channel => &[
                EventKind::ChannelSwitchStarted,
                EventKind::ChannelSwitch,
                EventKind::Radar,
            ],
            EventClass::Vendor => &[EventKind::Vendor],
            EventClass::All => &EventKind::ALL,
        }
    }
}

#[derive(Args)]
pub struct MonitorArgs {
    /// Event classes to monitor.
    #[arg(default_value = "all")]
    classes: Vec<EventClass>,

    /// Only events for this interface.
    #[arg(short, long)]
    interface: Option<String>,

    /// Only events for this wiphy.
    #[arg(long, conflicts_with = "interface")]
    phy: Option<u32>,
}

pub async fn run(args: MonitorArgs, format: Format) -> Result<()> {
    let mut state = connect().await?;

    let scope = match (&args.interface, args.phy) {
        (Some(name), _) => Scope::Device(ifindex(&mut state, name).await?),
        (None, Some(wiphy)) => Scope::Radio(wiphy),
        (None, None) => Scope::Any,
    };
    let mut kinds: Vec<EventKind> = args.classes.iter().flat_map(|c| c.kinds()).copied().collect();
    kinds.sort_by_key(|k| k.slot());
    kinds.dedup();

    let (listener, mut events) = event_channel(scope, &kinds);
    state.add_listener(listener);
    let reader = tokio::spawn(async move { state.run().await });

    while let Some(event) = events.next().await {
        if format.json {
            print_json(&event, format)?;
        } else {
            print_event(&event);
        }
    }

    // The stream only ends when the socket loop stopped.
    match reader.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::other(e).into()),
    }
}

fn print_event(event: &WifiEvent) {
    let origin = match (&event.origin.ifname, event.origin.ifindex, event.origin.wiphy) {
        (Some(name), _, _) => name.clone(),
        (None, Some(ifindex), _) => format!("if#{}", ifindex),
        (None, None, Some(wiphy)) => format!("phy#{}", wiphy),
        (None, None, None) => "-".to_owned(),
    };
    match &event.payload {
        EventPayload::None => println!("{}: {:?}", origin, event.kind),
        payload => println!("{}: {:?} {:?}", origin, event.kind, payload),
    }
}
