//! Scheduler actions and the ordered tables that relate them.

use std::fmt;

/// One thing the scheduler can do to a radio, access point or endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
#[repr(u8)]
pub enum Action {
    /// Stop the daemon serving the entity.
    StopDaemon = 0,
    /// Take the entity down.
    Disable = 1,

    /// Push the configured regulatory domain to the kernel.
    SetRegDomain = 2,
    /// Push the configured antenna masks to the kernel.
    SetAntenna = 3,
    /// Push the configured transmit power to the kernel.
    SetTxPower = 4,

    /// Full daemon (re)start with freshly generated configuration.
    StartDaemon = 5,
    /// Signal the daemon to re-read its configuration.
    Reconfigure = 6,
    /// Disable and re-enable the interface inside the daemon.
    Toggle = 7,
    /// Reload one security key.
    ReloadKey = 8,
    /// Regenerate beacon and probe-response templates.
    UpdateBeacon = 9,

    SwitchChannel = 10,
    UpdateMacFilter = 11,
    UpdateWps = 12,
    SetParams = 13,

    /// Bring the entity up.
    Enable = 14,

    /// Associate a station endpoint.
    Connect = 15,
    /// Push incremental configuration to the station daemon.
    Update = 16,
}

/// Apply actions, most to least globally disruptive.
pub const APPLY_ORDER: [Action; 5] = [
    Action::StartDaemon,
    Action::Reconfigure,
    Action::Toggle,
    Action::ReloadKey,
    Action::UpdateBeacon,
];

/// Actions a running daemon can take without a restart.
pub const DYNCONF_ORDER: [Action; 4] = [
    Action::SwitchChannel,
    Action::UpdateMacFilter,
    Action::UpdateWps,
    Action::SetParams,
];

/// Actions that take something down.
pub const TEARDOWN_ORDER: [Action; 2] = [Action::StopDaemon, Action::Disable];

/// Radio settings applied over netlink.
pub const RADIO_SETTINGS_ORDER: [Action; 3] = [
    Action::SetRegDomain,
    Action::SetAntenna,
    Action::SetTxPower,
];

/// Station endpoint actions, in execution order.
pub const ENDPOINT_ORDER: [Action; 3] = [Action::StartDaemon, Action::Connect, Action::Update];

impl Action {
    /// Every action, in discriminant order.
    pub const ALL: [Action; 17] = [
        Action::StopDaemon,
        Action::Disable,
        Action::SetRegDomain,
        Action::SetAntenna,
        Action::SetTxPower,
        Action::StartDaemon,
        Action::Reconfigure,
        Action::Toggle,
        Action::ReloadKey,
        Action::UpdateBeacon,
        Action::SwitchChannel,
        Action::UpdateMacFilter,
        Action::UpdateWps,
        Action::SetParams,
        Action::Enable,
        Action::Connect,
        Action::Update,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::StopDaemon => "stop_daemon",
            Action::Disable => "disable",
            Action::SetRegDomain => "set_reg_domain",
            Action::SetAntenna => "set_antenna",
            Action::SetTxPower => "set_tx_power",
            Action::StartDaemon => "start_daemon",
            Action::Reconfigure => "reconfigure",
            Action::Toggle => "toggle",
            Action::ReloadKey => "reload_key",
            Action::UpdateBeacon => "update_beacon",
            Action::SwitchChannel => "switch_channel",
            Action::UpdateMacFilter => "update_mac_filter",
            Action::UpdateWps => "update_wps",
            Action::SetParams => "set_params",
            Action::Enable => "enable",
            Action::Connect => "connect",
            Action::Update => "update",
        }
    }

    fn bit(self) -> u64 {
        1 << self as u8
    }

    /// Position in [`APPLY_ORDER`]; lower is more disruptive.
    pub fn apply_rank(self) -> Option<usize> {
        APPLY_ORDER.iter().position(|&a| a == self)
    }

    pub fn is_apply(self) -> bool {
        self.apply_rank().is_some()
    }

    pub fn is_dyn_conf(self) -> bool {
        DYNCONF_ORDER.contains(&self)
    }

    pub fn is_teardown(self) -> bool {
        TEARDOWN_ORDER.contains(&self)
    }

    pub fn is_radio_setting(self) -> bool {
        RADIO_SETTINGS_ORDER.contains(&self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| crate::Error::InvalidArgument(format!("unknown action: {}", s)))
    }
}

/// A set of actions, one bit each.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(u64);

impl ActionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    /// Add `action`. Returns `false` if it was already present.
    pub fn insert(&mut self, action: Action) -> bool {
        let had = self.contains(action);
        self.0 |= action.bit();
        !had
    }

    /// Remove `action`. Returns `true` if it was present.
    pub fn remove(&mut self, action: Action) -> bool {
        let had = self.contains(action);
        self.0 &= !action.bit();
        had
    }

    pub fn remove_all(&mut self, actions: &[Action]) {
        for &action in actions {
            self.remove(action);
        }
    }

    pub fn contains_any(self, actions: &[Action]) -> bool {
        actions.iter().any(|&a| self.contains(a))
    }

    /// First member of `order` present in the set.
    pub fn first_of(self, order: &[Action]) -> Option<Action> {
        order.iter().copied().find(|&a| self.contains(a))
    }

    pub fn union(self, other: ActionSet) -> ActionSet {
        ActionSet(self.0 | other.0)
    }

    /// Remove and return every member.
    pub fn take(&mut self) -> ActionSet {
        std::mem::take(self)
    }

    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |&a| self.contains(a))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl<const N: usize> From<[Action; N]> for ActionSet {
    fn from(actions: [Action; N]) -> Self {
        actions.into_iter().collect()
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for action in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(action.name())?;
            first = false;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Result of asking for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// The action is now pending.
    Added,
    /// A pending action already covers it; nothing changed.
    AlreadyImplied,
}

impl Scheduled {
    pub fn is_added(self) -> bool {
        self == Scheduled::Added
    }
}

/// Schedule an apply action with subsumption.
///
/// A no-op if a strictly more disruptive apply action is pending. Otherwise
/// sets `action` and clears every less disruptive one; a full restart also
/// clears all dynamic-conf actions. Actions outside [`APPLY_ORDER`] are
/// simply inserted.
pub fn schedule_apply_action(set: &mut ActionSet, action: Action) -> Scheduled {
    let Some(rank) = action.apply_rank() else {
        set.insert(action);
        return Scheduled::Added;
    };
    if set.contains_any(&APPLY_ORDER[..rank]) {
        return Scheduled::AlreadyImplied;
    }
    set.insert(action);
    set.remove_all(&APPLY_ORDER[rank + 1..]);
    if rank == 0 {
        set.remove_all(&DYNCONF_ORDER);
    }
    Scheduled::Added
}

/// Schedule a dynamic-conf action. A pending restart re-applies everything,
/// so it implies every dynamic-conf action.
pub fn schedule_dyn_conf_action(set: &mut ActionSet, action: Action) -> Scheduled {
    if set.contains(APPLY_ORDER[0]) {
        return Scheduled::AlreadyImplied;
    }
    set.insert(action);
    Scheduled::Added
}

/// Most disruptive pending apply action.
pub fn next_apply_action(set: ActionSet) -> Option<Action> {
    set.first_of(&APPLY_ORDER)
}

/// First pending dynamic-conf action in table order.
pub fn next_dyn_conf_action(set: ActionSet) -> Option<Action> {
    set.first_of(&DYNCONF_ORDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_subsumes_beacon_update() {
        let mut set = ActionSet::from([Action::UpdateBeacon]);
        assert_eq!(schedule_apply_action(&mut set, Action::StartDaemon), Scheduled::Added);
        assert_eq!(set, ActionSet::from([Action::StartDaemon]));
    }

    #[test]
    fn test_less_disruptive_is_implied() {
        let mut set = ActionSet::from([Action::Reconfigure]);
        for action in [Action::Toggle, Action::ReloadKey, Action::UpdateBeacon] {
            assert_eq!(schedule_apply_action(&mut set, action), Scheduled::AlreadyImplied);
        }
        assert_eq!(set, ActionSet::from([Action::Reconfigure]));
    }

    #[test]
    fn test_same_action_is_idempotent() {
        let mut set = ActionSet::empty();
        assert!(schedule_apply_action(&mut set, Action::Toggle).is_added());
        assert!(schedule_apply_action(&mut set, Action::Toggle).is_added());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_restart_clears_dyn_conf() {
        let mut set = ActionSet::from([Action::SwitchChannel, Action::SetParams, Action::Enable]);
        schedule_apply_action(&mut set, Action::StartDaemon);
        assert_eq!(set, ActionSet::from([Action::StartDaemon, Action::Enable]));
        assert_eq!(
            schedule_dyn_conf_action(&mut set, Action::UpdateWps),
            Scheduled::AlreadyImplied
        );
    }

    #[test]
    fn test_reconfigure_keeps_dyn_conf() {
        let mut set = ActionSet::from([Action::SwitchChannel, Action::ReloadKey]);
        schedule_apply_action(&mut set, Action::Reconfigure);
        assert_eq!(set, ActionSet::from([Action::SwitchChannel, Action::Reconfigure]));
    }

    #[test]
    fn test_non_apply_action_inserted() {
        let mut set = ActionSet::from([Action::StartDaemon]);
        assert!(schedule_apply_action(&mut set, Action::Enable).is_added());
        assert!(set.contains(Action::Enable));
    }

    #[test]
    fn test_next_actions() {
        let set = ActionSet::from([
            Action::UpdateBeacon,
            Action::Toggle,
            Action::SetParams,
            Action::UpdateMacFilter,
        ]);
        assert_eq!(next_apply_action(set), Some(Action::Toggle));
        assert_eq!(next_dyn_conf_action(set), Some(Action::UpdateMacFilter));
        assert_eq!(next_apply_action(ActionSet::empty()), None);
    }

    #[test]
    fn test_action_names() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
        assert!("restart".parse::<Action>().is_err());
        assert_eq!(
            ActionSet::from([Action::Enable, Action::StopDaemon]).to_string(),
            "stop_daemon,enable"
        );
        assert_eq!(ActionSet::empty().to_string(), "-");
    }

    #[test]
    fn test_table_membership_is_disjoint() {
        for action in Action::ALL {
            let groups = [
                action.is_apply(),
                action.is_dyn_conf(),
                action.is_teardown(),
                action.is_radio_setting(),
            ];
            assert!(groups.iter().filter(|&&g| g).count() <= 1, "{}", action);
        }
    }
}
