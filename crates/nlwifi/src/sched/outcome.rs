//! Translation of daemon results into follow-up actions.

use super::action::{Action, ActionSet, Scheduled, schedule_apply_action};
use super::entity::MloState;

/// What a daemon reports it needs after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum DaemonOutcome {
    /// Nothing further.
    Done,
    NeedsRestart,
    NeedsReconfigure,
    NeedsToggle,
    NeedsKeyReload,
    NeedsBeaconUpdate,
}

impl DaemonOutcome {
    /// The apply action this outcome asks for.
    pub fn action(self) -> Option<Action> {
        match self {
            DaemonOutcome::Done => None,
            DaemonOutcome::NeedsRestart => Some(Action::StartDaemon),
            DaemonOutcome::NeedsReconfigure => Some(Action::Reconfigure),
            DaemonOutcome::NeedsToggle => Some(Action::Toggle),
            DaemonOutcome::NeedsKeyReload => Some(Action::ReloadKey),
            DaemonOutcome::NeedsBeaconUpdate => Some(Action::UpdateBeacon),
        }
    }
}

/// Toggling one member of a multi-link group leaves its sibling links
/// inconsistent; such radios get a full restart instead.
pub fn escalate(action: Action, mlo: MloState) -> Action {
    if action == Action::Toggle && mlo.is_engaged() {
        Action::StartDaemon
    } else {
        action
    }
}

/// Fold one outcome into `set` with a single scheduling call.
///
/// Returns the action asked for and how it was scheduled, or `None` for
/// [`DaemonOutcome::Done`].
pub fn apply_outcome(set: &mut ActionSet, outcome: DaemonOutcome, mlo: MloState) -> Option<(Action, Scheduled)> {
    let action = escalate(outcome.action()?, mlo);
    Some((action, schedule_apply_action(set, action)))
}
