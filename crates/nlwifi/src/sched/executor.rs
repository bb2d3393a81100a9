//! Executing scheduled actions.
//!
//! [`ActionExecutor`] is what a scheduling pass calls for every action it
//! picks. [`WifiExecutor`] is the production implementation: radio
//! settings go to the kernel through [`Nl80211State`], daemon lifecycle
//! goes to a [`DaemonControl`] supplied by the host.

use std::future::Future;

use super::action::Action;
use super::entity::{AccessPoint, Endpoint, Entities, EntityRef, Radio};
use super::outcome::DaemonOutcome;
use crate::netlink::{Error, Result, Transport};
use crate::nl80211::Nl80211State;

/// The entity an action runs against, with its radio.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Radio(&'a Radio),
    Ap {
        radio: &'a Radio,
        ap: &'a AccessPoint,
    },
    Endpoint {
        radio: &'a Radio,
        endpoint: &'a Endpoint,
    },
}

impl<'a> Target<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Target::Radio(radio) => &radio.name,
            Target::Ap { ap, .. } => &ap.name,
            Target::Endpoint { endpoint, .. } => &endpoint.name,
        }
    }

    pub fn radio(&self) -> &'a Radio {
        match *self {
            Target::Radio(radio) | Target::Ap { radio, .. } | Target::Endpoint { radio, .. } => radio,
        }
    }

    /// Which daemon serves the target.
    pub fn daemon(&self) -> Daemon {
        match self {
            Target::Endpoint { .. } => Daemon::Station,
            _ => Daemon::AccessPoint,
        }
    }

    /// Name of the daemon instance: the radio for access points, the
    /// endpoint itself for stations.
    pub fn daemon_instance(&self) -> &'a str {
        match *self {
            Target::Radio(radio) | Target::Ap { radio, .. } => &radio.name,
            Target::Endpoint { endpoint, .. } => &endpoint.name,
        }
    }
}

impl Entities {
    pub fn target(&self, entity: EntityRef) -> Target<'_> {
        match entity {
            EntityRef::Radio(id) => Target::Radio(self.radio(id)),
            EntityRef::Ap(id) => {
                let ap = self.ap(id);
                Target::Ap {
                    radio: self.radio(ap.radio),
                    ap,
                }
            }
            EntityRef::Endpoint(id) => {
                let endpoint = self.endpoint(id);
                Target::Endpoint {
                    radio: self.radio(endpoint.radio),
                    endpoint,
                }
            }
        }
    }
}

/// Runs one action for a scheduling pass.
pub trait ActionExecutor {
    /// Execute `action` on `target` and report what the daemon needs next.
    fn execute(&mut self, action: Action, target: Target<'_>) -> impl Future<Output = Result<DaemonOutcome>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Daemon {
    /// Access-point manager, one instance per radio.
    AccessPoint,
    /// Supplicant, one instance per station endpoint.
    Station,
}

impl Daemon {
    pub fn name(self) -> &'static str {
        match self {
            Daemon::AccessPoint => "access point",
            Daemon::Station => "station",
        }
    }

    /// Build an [`Error::Daemon`] for an instance of this daemon.
    pub fn error(self, name: &str, message: impl Into<String>) -> Error {
        Error::Daemon {
            daemon: self.name(),
            name: name.to_owned(),
            message: message.into(),
        }
    }
}

/// Outbound control of the access-point and station daemons.
///
/// Implemented by the host; the control-socket protocol and configuration
/// file format live behind it.
pub trait DaemonControl {
    fn start(&mut self, daemon: Daemon, instance: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    fn stop(&mut self, daemon: Daemon, instance: &str) -> impl Future<Output = Result<()>>;

    /// Make the daemon re-read its configuration.
    fn reload(&mut self, daemon: Daemon, instance: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    /// Disable and re-enable an interface inside the access-point daemon.
    fn toggle(&mut self, name: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    fn set_enabled(&mut self, daemon: Daemon, name: &str, enabled: bool) -> impl Future<Output = Result<DaemonOutcome>>;

    fn reload_key(&mut self, ap: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    fn update_beacon(&mut self, ap: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    /// Apply one dynamic-conf action to a running daemon.
    fn apply_dynamic(&mut self, name: &str, action: Action) -> impl Future<Output = Result<DaemonOutcome>>;

    fn connect(&mut self, endpoint: &str) -> impl Future<Output = Result<DaemonOutcome>>;

    /// Rewrite the configuration file of a daemon instance.
    fn regenerate_config(&mut self, daemon: Daemon, instance: &str) -> impl Future<Output = Result<()>>;

    /// Called after every executed action.
    fn notify_state(&mut self, _name: &str, _action: Action, _ok: bool) {}
}

/// Executor backed by nl80211 and a [`DaemonControl`].
pub struct WifiExecutor<'a, T: Transport, C> {
    nl: &'a mut Nl80211State<T>,
    control: C,
}

impl<'a, T: Transport, C: DaemonControl> WifiExecutor<'a, T, C> {
    pub fn new(nl: &'a mut Nl80211State<T>, control: C) -> Self {
        Self { nl, control }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn into_control(self) -> C {
        self.control
    }

    async fn radio_setting(&mut self, action: Action, radio: &Radio) -> Result<DaemonOutcome> {
        let settings = &radio.settings;
        match action {
            Action::SetRegDomain => {
                if let Some(alpha2) = &settings.reg_domain {
                    self.nl.set_reg_domain(alpha2).await?;
                }
            }
            Action::SetAntenna => {
                if let Some((tx, rx)) = settings.antennas {
                    self.nl.set_antenna(radio.wiphy, tx, rx).await?;
                }
            }
            Action::SetTxPower => {
                if let Some(setting) = settings.tx_power {
                    self.nl.set_tx_power(radio.wiphy, setting).await?;
                }
            }
            _ => {}
        }
        Ok(DaemonOutcome::Done)
    }

    async fn run(&mut self, action: Action, target: Target<'_>) -> Result<DaemonOutcome> {
        let name = target.name();
        let daemon = target.daemon();
        let instance = target.daemon_instance();
        match (action, target) {
            (a, Target::Radio(radio)) if a.is_radio_setting() => self.radio_setting(a, radio).await,
            (a, _) if a.is_radio_setting() => Err(Error::InvalidArgument(format!(
                "{} applies to radios, not {}",
                a, name
            ))),
            (Action::StartDaemon, _) => {
                self.control.regenerate_config(daemon, instance).await?;
                self.control.start(daemon, instance).await
            }
            (Action::StopDaemon, _) => {
                self.control.stop(daemon, instance).await?;
                Ok(DaemonOutcome::Done)
            }
            (Action::Reconfigure | Action::Update, _) => {
                self.control.regenerate_config(daemon, instance).await?;
                self.control.reload(daemon, instance).await
            }
            (Action::Toggle, _) => self.control.toggle(name).await,
            (Action::Enable | Action::Disable, _) => {
                self.control
                    .set_enabled(daemon, name, action == Action::Enable)
                    .await
            }
            (Action::ReloadKey, _) => self.control.reload_key(name).await,
            (Action::UpdateBeacon, _) => self.control.update_beacon(name).await,
            (Action::Connect, _) => self.control.connect(name).await,
            (a, _) => self.control.apply_dynamic(name, a).await,
        }
    }
}

impl<T: Transport, C: DaemonControl> ActionExecutor for WifiExecutor<'_, T, C> {
    async fn execute(&mut self, action: Action, target: Target<'_>) -> Result<DaemonOutcome> {
        let result = self.run(action, target).await;
        self.control
            .notify_state(target.name(), action, result.is_ok());
        result
    }
}
