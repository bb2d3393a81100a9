//! Scheduling passes.

use std::fmt;

use super::action::{
    APPLY_ORDER, Action, DYNCONF_ORDER, ENDPOINT_ORDER, RADIO_SETTINGS_ORDER, Scheduled,
    TEARDOWN_ORDER, schedule_apply_action, schedule_dyn_conf_action,
};
use super::deps;
use super::entity::{Entities, EntityRef};
use super::executor::ActionExecutor;
use super::outcome::{self, DaemonOutcome};
use crate::netlink::{Error, Result};

/// Default bound on back-to-back passes in [`Scheduler::run_until_idle`].
const DEFAULT_MAX_PASSES: usize = 8;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    max_passes: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bound on passes per [`Scheduler::run_until_idle`] call.
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    pub fn get_max_passes(&self) -> usize {
        self.max_passes
    }
}

/// Where the scheduler is in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Idle,
    DependencyCheck,
    Running,
}

/// One action on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub entity: EntityRef,
    pub action: Action,
}

impl Step {
    pub fn new(entity: EntityRef, action: Action) -> Self {
        Self { entity, action }
    }
}

/// What a pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    pub executed: Vec<Step>,
    pub failed: Vec<(Step, Error)>,
    /// Follow-up actions the executed ones asked for; pending for the next pass.
    pub rescheduled: Vec<Step>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed, {} failed, {} rescheduled",
            self.executed.len(),
            self.failed.len(),
            self.rescheduled.len()
        )
    }
}

/// Action scheduler over a set of radios, access points and endpoints.
#[derive(Debug, Default)]
pub struct Scheduler {
    entities: Entities,
    phase: PassState,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(entities: Entities) -> Self {
        Self::with_config(entities, SchedulerConfig::default())
    }

    pub fn with_config(entities: Entities, config: SchedulerConfig) -> Self {
        Self {
            entities,
            phase: PassState::Idle,
            config,
        }
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }

    pub fn phase(&self) -> PassState {
        self.phase
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Nothing pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.entities.is_idle()
    }

    /// Schedule `action` on the entity called `name`.
    pub fn schedule(&mut self, name: &str, action: Action) -> Result<Scheduled> {
        let entity = self.entities.resolve(name)?;
        Ok(self.schedule_on(entity, action))
    }

    /// Schedule `action` on `entity`.
    ///
    /// Apply actions are subject to subsumption and to the multi-link
    /// toggle escalation; [`Scheduled::AlreadyImplied`] is a normal result.
    pub fn schedule_on(&mut self, entity: EntityRef, action: Action) -> Scheduled {
        let mlo = self.entities.radio(self.entities.radio_of(entity)).mlo;
        let set = &mut self.entities.actions_mut(entity).pending;
        let (action, scheduled) = if action.is_apply() {
            let action = outcome::escalate(action, mlo);
            (action, schedule_apply_action(set, action))
        } else if action.is_dyn_conf() {
            (action, schedule_dyn_conf_action(set, action))
        } else {
            set.insert(action);
            (action, Scheduled::Added)
        };
        tracing::debug!(
            entity = self.entities.name(entity),
            %action,
            ?scheduled,
            "action scheduled"
        );
        scheduled
    }

    /// Fold a daemon outcome for `entity` into its pending set.
    pub fn apply_outcome(&mut self, entity: EntityRef, outcome: DaemonOutcome) -> Option<(Action, Scheduled)> {
        let mlo = self.entities.radio(self.entities.radio_of(entity)).mlo;
        outcome::apply_outcome(&mut self.entities.actions_mut(entity).pending, outcome, mlo)
    }

    /// The action the next pass would run first.
    pub fn next_action(&self) -> Option<Step> {
        select(&self.entities, |e| self.entities.actions(e).pending)
    }

    /// Run one pass: propagate dependencies, then execute everything that
    /// was pending, most disruptive first.
    ///
    /// Outcomes of executed actions become pending for the next pass.
    pub async fn run_pass<E: ActionExecutor>(&mut self, executor: &mut E) -> PassReport {
        self.phase = PassState::DependencyCheck;
        let changed = deps::propagate(&mut self.entities);
        if changed > 0 {
            tracing::trace!(changed, "dependencies propagated");
        }
        self.entities.begin_pass();
        self.phase = PassState::Running;

        let mut report = PassReport::default();
        while let Some(step) = select(&self.entities, |e| self.entities.actions(e).active) {
            self.entities.actions_mut(step.entity).active.remove(step.action);
            let name = self.entities.name(step.entity).to_owned();
            tracing::debug!(entity = %name, action = %step.action, "executing action");

            let result = executor
                .execute(step.action, self.entities.target(step.entity))
                .await;
            match result {
                Ok(outcome) => {
                    self.entities.note_executed(step.entity, step.action);
                    report.executed.push(step);
                    if let Some((action, Scheduled::Added)) = self.apply_outcome(step.entity, outcome) {
                        tracing::debug!(entity = %name, %action, "follow-up scheduled");
                        report.rescheduled.push(Step::new(step.entity, action));
                    }
                }
                Err(e) => {
                    tracing::warn!(entity = %name, action = %step.action, error = %e, "action failed");
                    report.failed.push((step, e));
                }
            }
        }

        self.phase = PassState::Idle;
        tracing::debug!(%report, "pass finished");
        report
    }

    /// Run passes until nothing is pending or the configured bound is hit.
    pub async fn run_until_idle<E: ActionExecutor>(&mut self, executor: &mut E) -> Vec<PassReport> {
        let mut reports = Vec::new();
        while !self.is_idle() {
            if reports.len() >= self.config.max_passes {
                tracing::warn!(
                    passes = reports.len(),
                    "scheduler still busy after maximum number of passes"
                );
                break;
            }
            reports.push(self.run_pass(executor).await);
        }
        reports
    }
}

/// Pick the next step from the sets `actions_of` returns.
///
/// Order: teardown, radio settings, the single most disruptive apply
/// action on a radio or access point, dynamic-conf in table order,
/// enable, then endpoint actions. Anything left is taken in discriminant
/// order so every set bit is eventually picked.
fn select<F>(entities: &Entities, actions_of: F) -> Option<Step>
where
    F: Fn(EntityRef) -> super::action::ActionSet,
{
    let all: Vec<EntityRef> = entities.all().collect();
    let daemons: Vec<EntityRef> = all
        .iter()
        .copied()
        .filter(|e| !matches!(e, EntityRef::Endpoint(_)))
        .collect();
    let radios: Vec<EntityRef> = entities.radio_ids().map(EntityRef::Radio).collect();
    let endpoints: Vec<EntityRef> = entities.endpoint_ids().map(EntityRef::Endpoint).collect();

    let first = |set: &[EntityRef], order: &[Action]| {
        set.iter()
            .find_map(|&e| actions_of(e).first_of(order).map(|a| Step::new(e, a)))
    };

    if let Some(step) = first(&all, &TEARDOWN_ORDER) {
        return Some(step);
    }
    if let Some(step) = first(&radios, &RADIO_SETTINGS_ORDER) {
        return Some(step);
    }
    for action in APPLY_ORDER {
        if let Some(step) = first(&daemons, &[action]) {
            return Some(step);
        }
    }
    for action in DYNCONF_ORDER {
        if let Some(step) = first(&daemons, &[action]) {
            return Some(step);
        }
    }
    if let Some(step) = first(&all, &[Action::Enable]) {
        return Some(step);
    }
    if let Some(step) = first(&endpoints, &ENDPOINT_ORDER) {
        return Some(step);
    }
    first(&all, &Action::ALL)
}
