//! Dependency propagation across a radio and the interfaces on it.
//!
//! Runs over the pending sets once per pass, before anything executes.

use super::action::{APPLY_ORDER, Action, DYNCONF_ORDER, schedule_apply_action};
use super::entity::{Entities, EntityRef};

/// Propagate dependencies between pending actions. Returns the number of
/// sets that changed.
pub fn propagate(entities: &mut Entities) -> usize {
    let mut changed = 0;

    for radio in entities.radio_ids().collect::<Vec<_>>() {
        let pending = entities.radio(radio).actions.pending;

        if pending.contains(Action::Enable) {
            for ep in entities.endpoints_of(radio).collect::<Vec<_>>() {
                let endpoint = entities.endpoint_mut(ep);
                if endpoint.enabled && endpoint.actions.pending.insert(Action::Enable) {
                    tracing::trace!(endpoint = %endpoint.name, "enable follows radio");
                    changed += 1;
                }
            }
        }

        // Nothing warm survives a cold restart or a regulatory change.
        if pending.contains(Action::StartDaemon) || pending.contains(Action::SetRegDomain) {
            let mut targets = vec![EntityRef::Radio(radio)];
            targets.extend(entities.aps_of(radio).map(EntityRef::Ap));
            for entity in targets {
                let set = &mut entities.actions_mut(entity).pending;
                if set.contains_any(&DYNCONF_ORDER) {
                    set.remove_all(&DYNCONF_ORDER);
                    changed += 1;
                }
            }
        }

        // The restarted daemon re-applies every BSS configuration.
        if pending.contains(Action::StartDaemon) {
            for ap in entities.aps_of(radio).collect::<Vec<_>>() {
                let set = &mut entities.ap_mut(ap).actions.pending;
                if set.contains_any(&APPLY_ORDER) {
                    set.remove_all(&APPLY_ORDER);
                    changed += 1;
                }
            }
        }
    }

    for ep in entities.endpoint_ids().collect::<Vec<_>>() {
        let endpoint = entities.endpoint_mut(ep);
        let set = &mut endpoint.actions.pending;
        if set.contains(Action::Connect)
            && !endpoint.daemon_running
            && schedule_apply_action(set, Action::StartDaemon).is_added()
        {
            tracing::trace!(endpoint = %endpoint.name, "connect needs station daemon");
            changed += 1;
        }
        if set.contains(Action::StartDaemon) && set.contains_any(&[Action::Update, Action::Connect]) {
            set.remove_all(&[Action::Update, Action::Connect]);
            changed += 1;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::action::ActionSet;
    use crate::sched::entity::Radio;

    fn sample() -> Entities {
        let mut entities = Entities::new();
        entities.add_radio(Radio::new("radio0", 0)).unwrap();
        entities.add_radio(Radio::new("radio1", 1)).unwrap();
        entities.add_ap("ap0", "radio0", None).unwrap();
        entities.add_ap("ap1", "radio1", None).unwrap();
        entities.add_endpoint("sta0", "radio0", None).unwrap();
        entities.add_endpoint("sta1", "radio0", None).unwrap();
        entities
    }

    fn pending(entities: &Entities, name: &str) -> ActionSet {
        entities.pending(entities.resolve(name).unwrap())
    }

    fn set(entities: &mut Entities, name: &str, actions: &[Action]) {
        let entity = entities.resolve(name).unwrap();
        entities.actions_mut(entity).pending = actions.iter().copied().collect();
    }

    #[test]
    fn test_radio_enable_enables_active_endpoints() {
        let mut entities = sample();
        let sta1 = entities.resolve("sta1").unwrap();
        if let EntityRef::Endpoint(id) = sta1 {
            entities.endpoint_mut(id).enabled = false;
        }
        set(&mut entities, "radio0", &[Action::Enable]);
        assert_eq!(propagate(&mut entities), 1);
        assert!(pending(&entities, "sta0").contains(Action::Enable));
        assert!(pending(&entities, "sta1").is_empty());
    }

    #[test]
    fn test_restart_clears_warm_actions_on_radio_only() {
        let mut entities = sample();
        set(&mut entities, "radio0", &[Action::StartDaemon, Action::SwitchChannel]);
        set(&mut entities, "ap0", &[Action::UpdateWps, Action::ReloadKey, Action::Enable]);
        set(&mut entities, "ap1", &[Action::UpdateWps, Action::ReloadKey]);
        propagate(&mut entities);
        assert_eq!(pending(&entities, "radio0"), ActionSet::from([Action::StartDaemon]));
        assert_eq!(pending(&entities, "ap0"), ActionSet::from([Action::Enable]));
        assert_eq!(
            pending(&entities, "ap1"),
            ActionSet::from([Action::UpdateWps, Action::ReloadKey])
        );
    }

    #[test]
    fn test_reg_change_clears_dyn_conf() {
        let mut entities = sample();
        set(&mut entities, "radio0", &[Action::SetRegDomain]);
        set(&mut entities, "ap0", &[Action::SwitchChannel, Action::UpdateBeacon]);
        propagate(&mut entities);
        assert_eq!(pending(&entities, "ap0"), ActionSet::from([Action::UpdateBeacon]));
    }

    #[test]
    fn test_connect_starts_station_daemon() {
        let mut entities = sample();
        set(&mut entities, "sta0", &[Action::Connect, Action::Update]);
        propagate(&mut entities);
        assert_eq!(pending(&entities, "sta0"), ActionSet::from([Action::StartDaemon]));
    }

    #[test]
    fn test_connect_with_running_daemon() {
        let mut entities = sample();
        let EntityRef::Endpoint(id) = entities.resolve("sta0").unwrap() else {
            panic!("sta0 is an endpoint");
        };
        entities.endpoint_mut(id).daemon_running = true;
        set(&mut entities, "sta0", &[Action::Connect]);
        assert_eq!(propagate(&mut entities), 0);
        assert_eq!(pending(&entities, "sta0"), ActionSet::from([Action::Connect]));
    }
}
