//! Radios, access points and station endpoints known to the scheduler.

use super::action::{Action, ActionSet};
use crate::netlink::{Error, Result};
use crate::nl80211::TxPowerSetting;

/// Pending and in-flight actions of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    /// Scheduled, not yet picked up by a pass.
    pub pending: ActionSet,
    /// Being applied by the running pass.
    pub active: ActionSet,
}

impl ActionState {
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Move everything pending into the running pass.
    pub(crate) fn begin_pass(&mut self) {
        let pending = self.pending.take();
        self.active = self.active.union(pending);
    }
}

/// Multi-link association state of a radio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct MloState {
    /// A multi-link association is up.
    pub active: bool,
    /// One is being set up.
    pub prospective: bool,
}

impl MloState {
    pub fn is_engaged(&self) -> bool {
        self.active || self.prospective
    }
}

/// Desired radio-wide settings pushed over nl80211.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioSettings {
    pub reg_domain: Option<String>,
    pub tx_power: Option<TxPowerSetting>,
    /// TX and RX antenna masks.
    pub antennas: Option<(u32, u32)>,
}

/// A physical radio and the access-point daemon instance on it.
#[derive(Debug, Clone)]
pub struct Radio {
    pub name: String,
    pub wiphy: u32,
    /// Desired enable state.
    pub enabled: bool,
    pub daemon_running: bool,
    pub mlo: MloState,
    pub settings: RadioSettings,
    pub actions: ActionState,
}

impl Radio {
    pub fn new(name: impl Into<String>, wiphy: u32) -> Self {
        Self {
            name: name.into(),
            wiphy,
            enabled: true,
            daemon_running: false,
            mlo: MloState::default(),
            settings: RadioSettings::default(),
            actions: ActionState::default(),
        }
    }
}

/// An access point (BSS) served by its radio's daemon.
#[derive(Debug, Clone)]
pub struct AccessPoint {
    pub name: String,
    pub radio: RadioId,
    pub ifindex: Option<u32>,
    pub enabled: bool,
    pub actions: ActionState,
}

/// A station interface driven by its own supplicant daemon.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub radio: RadioId,
    pub ifindex: Option<u32>,
    /// Desired enable state; an enabled endpoint follows its radio up.
    pub enabled: bool,
    pub daemon_running: bool,
    pub actions: ActionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RadioId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub(crate) usize);

/// Handle to any scheduled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Radio(RadioId),
    Ap(ApId),
    Endpoint(EndpointId),
}

/// Entity registry. Names are unique across all kinds.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    radios: Vec<Radio>,
    aps: Vec<AccessPoint>,
    endpoints: Vec<Endpoint>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_unique(&self, name: &str) -> Result<()> {
        if self.resolve(name).is_ok() {
            return Err(Error::InvalidArgument(format!("duplicate entity name: {}", name)));
        }
        Ok(())
    }

    pub fn add_radio(&mut self, radio: Radio) -> Result<RadioId> {
        self.ensure_unique(&radio.name)?;
        self.radios.push(radio);
        Ok(RadioId(self.radios.len() - 1))
    }

    /// Attach an access point to the radio named `radio`.
    pub fn add_ap(&mut self, name: impl Into<String>, radio: &str, ifindex: Option<u32>) -> Result<ApId> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let radio = self.radio_id(radio)?;
        self.aps.push(AccessPoint {
            name,
            radio,
            ifindex,
            enabled: true,
            actions: ActionState::default(),
        });
        Ok(ApId(self.aps.len() - 1))
    }

    /// Attach a station endpoint to the radio named `radio`.
    pub fn add_endpoint(&mut self, name: impl Into<String>, radio: &str, ifindex: Option<u32>) -> Result<EndpointId> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let radio = self.radio_id(radio)?;
        self.endpoints.push(Endpoint {
            name,
            radio,
            ifindex,
            enabled: true,
            daemon_running: false,
            actions: ActionState::default(),
        });
        Ok(EndpointId(self.endpoints.len() - 1))
    }

    /// Look up any entity by name.
    pub fn resolve(&self, name: &str) -> Result<EntityRef> {
        if let Some(i) = self.radios.iter().position(|r| r.name == name) {
            return Ok(EntityRef::Radio(RadioId(i)));
        }
        if let Some(i) = self.aps.iter().position(|a| a.name == name) {
            return Ok(EntityRef::Ap(ApId(i)));
        }
        if let Some(i) = self.endpoints.iter().position(|e| e.name == name) {
            return Ok(EntityRef::Endpoint(EndpointId(i)));
        }
        Err(Error::UnknownEntity {
            kind: "entity",
            name: name.to_owned(),
        })
    }

    pub fn radio_id(&self, name: &str) -> Result<RadioId> {
        self.radios
            .iter()
            .position(|r| r.name == name)
            .map(RadioId)
            .ok_or_else(|| Error::UnknownEntity {
                kind: "radio",
                name: name.to_owned(),
            })
    }

    pub fn radio(&self, id: RadioId) -> &Radio {
        &self.radios[id.0]
    }

    pub fn radio_mut(&mut self, id: RadioId) -> &mut Radio {
        &mut self.radios[id.0]
    }

    pub fn ap(&self, id: ApId) -> &AccessPoint {
        &self.aps[id.0]
    }

    pub fn ap_mut(&mut self, id: ApId) -> &mut AccessPoint {
        &mut self.aps[id.0]
    }

    pub fn endpoint(&self, id: EndpointId) -> &Endpoint {
        &self.endpoints[id.0]
    }

    pub fn endpoint_mut(&mut self, id: EndpointId) -> &mut Endpoint {
        &mut self.endpoints[id.0]
    }

    pub fn radio_ids(&self) -> impl Iterator<Item = RadioId> + '_ {
        (0..self.radios.len()).map(RadioId)
    }

    pub fn ap_ids(&self) -> impl Iterator<Item = ApId> + '_ {
        (0..self.aps.len()).map(ApId)
    }

    pub fn endpoint_ids(&self) -> impl Iterator<Item = EndpointId> + '_ {
        (0..self.endpoints.len()).map(EndpointId)
    }

    /// Access points attached to `radio`.
    pub fn aps_of(&self, radio: RadioId) -> impl Iterator<Item = ApId> + '_ {
        self.ap_ids().filter(move |&id| self.ap(id).radio == radio)
    }

    /// Station endpoints attached to `radio`.
    pub fn endpoints_of(&self, radio: RadioId) -> impl Iterator<Item = EndpointId> + '_ {
        self.endpoint_ids()
            .filter(move |&id| self.endpoint(id).radio == radio)
    }

    /// Every entity, radios first.
    pub fn all(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.radio_ids()
            .map(EntityRef::Radio)
            .chain(self.ap_ids().map(EntityRef::Ap))
            .chain(self.endpoint_ids().map(EntityRef::Endpoint))
    }

    pub fn name(&self, entity: EntityRef) -> &str {
        match entity {
            EntityRef::Radio(id) => &self.radio(id).name,
            EntityRef::Ap(id) => &self.ap(id).name,
            EntityRef::Endpoint(id) => &self.endpoint(id).name,
        }
    }

    /// Radio an entity lives on.
    pub fn radio_of(&self, entity: EntityRef) -> RadioId {
        match entity {
            EntityRef::Radio(id) => id,
            EntityRef::Ap(id) => self.ap(id).radio,
            EntityRef::Endpoint(id) => self.endpoint(id).radio,
        }
    }

    pub fn actions(&self, entity: EntityRef) -> &ActionState {
        match entity {
            EntityRef::Radio(id) => &self.radio(id).actions,
            EntityRef::Ap(id) => &self.ap(id).actions,
            EntityRef::Endpoint(id) => &self.endpoint(id).actions,
        }
    }

    pub fn actions_mut(&mut self, entity: EntityRef) -> &mut ActionState {
        match entity {
            EntityRef::Radio(id) => &mut self.radio_mut(id).actions,
            EntityRef::Ap(id) => &mut self.ap_mut(id).actions,
            EntityRef::Endpoint(id) => &mut self.endpoint_mut(id).actions,
        }
    }

    pub fn pending(&self, entity: EntityRef) -> ActionSet {
        self.actions(entity).pending
    }

    /// Nothing pending or in flight anywhere.
    pub fn is_idle(&self) -> bool {
        self.all().all(|e| self.actions(e).is_idle())
    }

    pub(crate) fn begin_pass(&mut self) {
        for entity in self.all().collect::<Vec<_>>() {
            self.actions_mut(entity).begin_pass();
        }
    }

    /// Record the effect of a completed action on daemon bookkeeping.
    pub(crate) fn note_executed(&mut self, entity: EntityRef, action: Action) {
        let running = match action {
            Action::StartDaemon => true,
            Action::StopDaemon => false,
            _ => return,
        };
        match entity {
            EntityRef::Radio(id) => self.radio_mut(id).daemon_running = running,
            EntityRef::Endpoint(id) => self.endpoint_mut(id).daemon_running = running,
            EntityRef::Ap(id) => {
                let radio = self.ap(id).radio;
                self.radio_mut(radio).daemon_running = running;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entities {
        let mut entities = Entities::new();
        entities.add_radio(Radio::new("radio0", 0)).unwrap();
        entities.add_radio(Radio::new("radio1", 1)).unwrap();
        entities.add_ap("ap0", "radio0", Some(10)).unwrap();
        entities.add_ap("ap1", "radio1", Some(11)).unwrap();
        entities.add_endpoint("sta0", "radio0", Some(12)).unwrap();
        entities
    }

    #[test]
    fn test_resolve_by_name() {
        let entities = sample();
        assert_eq!(entities.resolve("radio1").unwrap(), EntityRef::Radio(RadioId(1)));
        assert_eq!(entities.resolve("ap1").unwrap(), EntityRef::Ap(ApId(1)));
        assert_eq!(entities.resolve("sta0").unwrap(), EntityRef::Endpoint(EndpointId(0)));

        let err = entities.resolve("wlan9").unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, Error::UnknownEntity { .. }));
    }

    #[test]
    fn test_duplicate_and_orphan_rejected() {
        let mut entities = sample();
        assert!(entities.add_ap("radio0", "radio1", None).is_err());
        assert!(matches!(
            entities.add_endpoint("sta1", "radio7", None),
            Err(Error::UnknownEntity { kind: "radio", .. })
        ));
    }

    #[test]
    fn test_children_of_radio() {
        let entities = sample();
        let radio0 = entities.radio_id("radio0").unwrap();
        assert_eq!(entities.aps_of(radio0).collect::<Vec<_>>(), [ApId(0)]);
        assert_eq!(entities.endpoints_of(radio0).collect::<Vec<_>>(), [EndpointId(0)]);
        assert_eq!(entities.radio_of(EntityRef::Ap(ApId(1))), RadioId(1));
        assert_eq!(entities.all().count(), 5);
    }

    #[test]
    fn test_begin_pass_moves_pending() {
        let mut entities = sample();
        let ap = EntityRef::Ap(ApId(0));
        entities.actions_mut(ap).pending.insert(Action::ReloadKey);
        assert!(!entities.is_idle());
        entities.begin_pass();
        assert!(entities.pending(ap).is_empty());
        assert!(entities.actions(ap).active.contains(Action::ReloadKey));
    }

    #[test]
    fn test_daemon_bookkeeping() {
        let mut entities = sample();
        entities.note_executed(EntityRef::Ap(ApId(0)), Action::StartDaemon);
        assert!(entities.radio(RadioId(0)).daemon_running);
        entities.note_executed(EntityRef::Endpoint(EndpointId(0)), Action::StartDaemon);
        entities.note_executed(EntityRef::Endpoint(EndpointId(0)), Action::StopDaemon);
        assert!(!entities.endpoint(EndpointId(0)).daemon_running);
    }
}
