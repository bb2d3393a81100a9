//! Daemon action scheduling.
//!
//! Every radio, access point and station endpoint carries a set of pending
//! actions. Callers schedule high-level actions; a pass resolves them into
//! the smallest ordered list of daemon lifecycle operations and runs them
//! through an [`ActionExecutor`].
//!
//! Apply actions are ranked by how disruptive they are (see
//! [`APPLY_ORDER`]). Scheduling one clears the less disruptive ones it
//! covers, and is a no-op when a more disruptive one is already pending.
//!
//! # Example
//!
//! ```rust
//! use nlwifi::sched::{Action, Entities, Radio, Scheduled, Scheduler};
//!
//! # fn example() -> nlwifi::Result<()> {
//! let mut entities = Entities::new();
//! entities.add_radio(Radio::new("radio0", 0))?;
//! entities.add_ap("ap0", "radio0", None)?;
//!
//! let mut sched = Scheduler::new(entities);
//! sched.schedule("ap0", Action::UpdateBeacon)?;
//! sched.schedule("ap0", Action::StartDaemon)?;
//! assert_eq!(sched.schedule("ap0", Action::ReloadKey)?, Scheduled::AlreadyImplied);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod action;
pub mod deps;
pub mod entity;
pub mod executor;
pub mod outcome;
pub mod scheduler;

pub use action::{
    APPLY_ORDER, Action, ActionSet, DYNCONF_ORDER, Scheduled, next_apply_action,
    next_dyn_conf_action, schedule_apply_action, schedule_dyn_conf_action,
};
pub use entity::{
    AccessPoint, ActionState, ApId, Endpoint, EndpointId, Entities, EntityRef, MloState, Radio,
    RadioId, RadioSettings,
};
pub use executor::{ActionExecutor, Daemon, DaemonControl, Target, WifiExecutor};
pub use outcome::DaemonOutcome;
pub use scheduler::{PassReport, PassState, Scheduler, SchedulerConfig, Step};
