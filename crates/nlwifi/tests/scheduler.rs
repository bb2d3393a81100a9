//! Scheduler behaviour through the public API.
//!
//! These tests need no privileges; the executor is an in-memory recorder.

use nlwifi::Result;
use nlwifi::sched::{
    APPLY_ORDER, Action, ActionExecutor, ActionSet, DaemonOutcome, Entities, EntityRef, MloState,
    Radio, Scheduled, Scheduler, Target, schedule_apply_action,
};

#[derive(Default)]
struct Recorder {
    log: Vec<String>,
    outcome: Option<(String, Action, DaemonOutcome)>,
}

impl ActionExecutor for Recorder {
    async fn execute(&mut self, action: Action, target: Target<'_>) -> Result<DaemonOutcome> {
        self.log.push(format!("{} {}", target.name(), action));
        match self.outcome.take() {
            Some((name, a, outcome)) if name == target.name() && a == action => Ok(outcome),
            other => {
                self.outcome = other;
                Ok(DaemonOutcome::Done)
            }
        }
    }
}

fn site(mlo: MloState) -> Scheduler {
    let mut entities = Entities::new();
    let mut radio = Radio::new("radio0", 0);
    radio.mlo = mlo;
    entities.add_radio(radio).unwrap();
    entities.add_radio(Radio::new("radio1", 1)).unwrap();
    entities.add_ap("ap0", "radio0", Some(10)).unwrap();
    entities.add_ap("ap1", "radio1", Some(11)).unwrap();
    entities.add_endpoint("sta0", "radio1", Some(12)).unwrap();
    Scheduler::new(entities)
}

fn pending(sched: &Scheduler, name: &str) -> ActionSet {
    sched.entities().pending(sched.entities().resolve(name).unwrap())
}

#[test]
fn test_restart_replaces_beacon_update() {
    let mut sched = site(MloState::default());
    sched.schedule("ap0", Action::UpdateBeacon).unwrap();
    assert_eq!(
        sched.schedule("ap0", Action::StartDaemon).unwrap(),
        Scheduled::Added
    );
    assert_eq!(pending(&sched, "ap0"), ActionSet::from([Action::StartDaemon]));
}

#[test]
fn test_toggle_on_mlo_radio_becomes_restart() {
    let mut sched = site(MloState {
        active: true,
        prospective: false,
    });
    sched.schedule("radio0", Action::Toggle).unwrap();
    assert_eq!(pending(&sched, "radio0"), ActionSet::from([Action::StartDaemon]));

    // Outcome path: a daemon asking for a toggle on the same radio.
    let ap0 = sched.entities().resolve("ap0").unwrap();
    let (action, _) = sched.apply_outcome(ap0, DaemonOutcome::NeedsToggle).unwrap();
    assert_eq!(action, Action::StartDaemon);

    // No multi-link on radio1: toggle stays a toggle.
    sched.schedule("radio1", Action::Toggle).unwrap();
    assert_eq!(pending(&sched, "radio1"), ActionSet::from([Action::Toggle]));
}

#[test]
fn test_subsumption_is_commutative() {
    for &first in &APPLY_ORDER[1..] {
        let mut a = ActionSet::empty();
        schedule_apply_action(&mut a, Action::StartDaemon);
        schedule_apply_action(&mut a, first);

        let mut b = ActionSet::empty();
        schedule_apply_action(&mut b, first);
        schedule_apply_action(&mut b, Action::StartDaemon);

        assert_eq!(a, b, "{}", first);
        assert_eq!(a, ActionSet::from([Action::StartDaemon]));
    }
}

#[test]
fn test_every_order_converges_to_most_disruptive() {
    // Any permutation of apply actions ends up with the most disruptive one.
    let perms: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let actions = [Action::Reconfigure, Action::ReloadKey, Action::UpdateBeacon];
    for perm in perms {
        let mut set = ActionSet::empty();
        for i in perm {
            schedule_apply_action(&mut set, actions[i]);
        }
        assert_eq!(set, ActionSet::from([Action::Reconfigure]), "{:?}", perm);
    }
}

#[tokio::test]
async fn test_station_connect_flow() {
    let mut sched = site(MloState::default());
    sched.schedule("sta0", Action::Connect).unwrap();
    sched.schedule("sta0", Action::Update).unwrap();

    let mut exec = Recorder::default();
    let reports = sched.run_until_idle(&mut exec).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(exec.log, ["sta0 start_daemon"]);

    let EntityRef::Endpoint(sta0) = sched.entities().resolve("sta0").unwrap() else {
        panic!("sta0 is an endpoint");
    };
    assert!(sched.entities().endpoint(sta0).daemon_running);

    // With the daemon up, connect runs directly.
    sched.schedule("sta0", Action::Connect).unwrap();
    sched.run_until_idle(&mut exec).await;
    assert_eq!(exec.log, ["sta0 start_daemon", "sta0 connect"]);
}

#[tokio::test]
async fn test_radio_bringup_order() {
    let mut sched = site(MloState::default());
    sched.schedule("ap1", Action::SetParams).unwrap();
    sched.schedule("radio1", Action::Enable).unwrap();
    sched.schedule("radio1", Action::SetRegDomain).unwrap();
    sched.schedule("ap1", Action::ReloadKey).unwrap();
    sched.schedule("radio0", Action::StopDaemon).unwrap();

    let mut exec = Recorder {
        outcome: Some(("ap1".into(), Action::ReloadKey, DaemonOutcome::NeedsBeaconUpdate)),
        ..Default::default()
    };
    let reports = sched.run_until_idle(&mut exec).await;
    assert_eq!(reports.len(), 2);
    assert_eq!(
        exec.log,
        [
            "radio0 stop_daemon",
            "radio1 set_reg_domain",
            "ap1 reload_key",
            "radio1 enable",
            "sta0 enable",
            "ap1 update_beacon",
        ]
    );
    assert!(sched.is_idle());
}
