//! Scenarios - ordered steps bracketed by fixture setup and teardown
//!
//! A scenario owns everything it touches: its browser session, its alias
//! store, and its fixture working copy all live in the [`StepContext`] and
//! are released together, so teardown happens on every exit path including
//! assertion failures and harness faults. Scenarios are independent; the
//! only shared input is the pristine fixture file, and each scenario gets
//! its own copy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::alias::AliasStore;
use crate::command::{Command, Dispatcher, WizardSpec};
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::FixtureCheckout;
use crate::indicator::{Extractor, Indicator, Probe};
use crate::poll::PollConfig;
use crate::session::{KeyChord, Session, SurfacePoint};

/// Lifecycle states of one scenario execution.
///
/// `TornDown` is reachable from every state but `Idle`; `Errored` marks a
/// harness fault (element never found, fixture load failure) as opposed to
/// `Failed` (assertion mismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Idle,
    Setup,
    Running,
    Passed,
    Failed,
    Errored,
    TornDown,
}

impl ScenarioState {
    pub fn can_advance(self, next: ScenarioState) -> bool {
        use ScenarioState::*;
        match (self, next) {
            (Idle, Setup) => true,
            (Setup, Running) => true,
            (Setup, Errored) => true,
            (Running, Passed | Failed | Errored) => true,
            (from, TornDown) => from != Idle && from != TornDown,
            _ => false,
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Idle => "idle",
            ScenarioState::Setup => "setup",
            ScenarioState::Running => "running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
            ScenarioState::Errored => "errored",
            ScenarioState::TornDown => "torn_down",
        };
        f.write_str(name)
    }
}

/// Enforces legal state transitions during execution.
#[derive(Debug)]
pub struct ScenarioTracker {
    state: ScenarioState,
}

impl ScenarioTracker {
    pub fn new() -> Self {
        Self {
            state: ScenarioState::Idle,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn advance(&mut self, next: ScenarioState) -> HarnessResult<()> {
        if !self.state.can_advance(next) {
            return Err(HarnessError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Default for ScenarioTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal classification of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed { reason: String },
    Errored { reason: String },
    Skipped { reason: String },
}

impl Verdict {
    /// Classify a step error: assertion misses fail the scenario, anything
    /// else is a harness fault.
    pub fn from_step_error(step: &str, error: &HarnessError) -> Self {
        let reason = format!("{step}: {error}");
        if error.is_assertion() {
            Verdict::Failed { reason }
        } else {
            Verdict::Errored { reason }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    pub fn terminal_state(&self) -> ScenarioState {
        match self {
            Verdict::Passed => ScenarioState::Passed,
            Verdict::Failed { .. } => ScenarioState::Failed,
            Verdict::Errored { .. } => ScenarioState::Errored,
            // Skipped scenarios never leave Idle; callers should not ask.
            Verdict::Skipped { .. } => ScenarioState::Idle,
        }
    }
}

/// Scenario-scoped mutable context handed to every step.
///
/// Holding the session, aliases, and working copy here (rather than in any
/// ambient shared state) keeps scenarios composable and parallel-safe
/// across sessions.
pub struct StepContext {
    pub session: Session,
    pub aliases: AliasStore,
    pub poll: PollConfig,
    pub checkout: FixtureCheckout,
}

impl StepContext {
    pub fn new(session: Session, poll: PollConfig, checkout: FixtureCheckout) -> Self {
        Self {
            session,
            aliases: AliasStore::new(),
            poll,
            checkout,
        }
    }

    pub async fn dispatch(&self, command: &Command) -> HarnessResult<()> {
        Dispatcher::new(&self.session, self.poll).dispatch(command).await
    }

    pub async fn click_surface(&self, point: &SurfacePoint, click_count: i64) -> HarnessResult<()> {
        Dispatcher::new(&self.session, self.poll)
            .click_surface(point, click_count)
            .await
    }

    pub async fn open_wizard(&self, wizard: &WizardSpec) -> HarnessResult<()> {
        Dispatcher::new(&self.session, self.poll).open_wizard(wizard).await
    }

    pub async fn wait_visible(&self, selector: &str) -> HarnessResult<()> {
        Dispatcher::new(&self.session, self.poll).wait_visible(selector).await
    }

    pub async fn wait_interactive(&self, selector: &str) -> HarnessResult<()> {
        Dispatcher::new(&self.session, self.poll)
            .wait_interactive(selector)
            .await
    }

    pub async fn key_chord(&self, chord: &KeyChord) -> HarnessResult<()> {
        self.session.key_chord(chord).await
    }

    pub async fn extract(&self, probe: &Probe) -> HarnessResult<Indicator> {
        Extractor::new(&self.session, self.poll).extract(probe).await
    }

    /// Release the session and the fixture working copy.
    pub async fn teardown(self) {
        if let Err(e) = self.session.close().await {
            tracing::warn!("session close during teardown: {e}");
        }
        // checkout drops here, discarding the working copy
    }
}

pub type StepFuture<'c> = futures::future::BoxFuture<'c, HarnessResult<()>>;

type StepFn = Box<dyn for<'c> Fn(&'c mut StepContext) -> StepFuture<'c> + Send + Sync>;

pub(crate) struct NamedStep {
    pub name: String,
    pub run: StepFn,
}

/// A named, ordered list of steps over one fixture.
pub struct Scenario {
    pub name: String,
    pub fixture: String,
    pub known_broken: Option<String>,
    pub(crate) steps: Vec<NamedStep>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, fixture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixture: fixture.into(),
            known_broken: None,
            steps: Vec::new(),
        }
    }

    /// Mark the scenario known-broken: it is skipped and recorded
    /// distinctly, so the suite pass rate is not polluted by known issues.
    pub fn known_broken(mut self, reason: impl Into<String>) -> Self {
        self.known_broken = Some(reason.into());
        self
    }

    /// Append a step. Steps run in declared order; a step only starts after
    /// the previous step's polled assertions have settled.
    pub fn step<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: for<'c> Fn(&'c mut StepContext) -> StepFuture<'c> + Send + Sync + 'static,
    {
        self.steps.push(NamedStep {
            name: name.into(),
            run: Box::new(f),
        });
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ScenarioState::Idle, ScenarioState::Setup => true; "idle enters setup")]
    #[test_case(ScenarioState::Idle, ScenarioState::Running => false; "idle cannot run directly")]
    #[test_case(ScenarioState::Setup, ScenarioState::Running => true; "setup starts running")]
    #[test_case(ScenarioState::Setup, ScenarioState::Errored => true; "setup may error out")]
    #[test_case(ScenarioState::Setup, ScenarioState::Failed => false; "setup cannot fail an assertion")]
    #[test_case(ScenarioState::Running, ScenarioState::Failed => true; "running may fail")]
    #[test_case(ScenarioState::Passed, ScenarioState::Running => false; "no re-entry after verdict")]
    #[test_case(ScenarioState::TornDown, ScenarioState::TornDown => false; "teardown happens once")]
    fn transition_legality(from: ScenarioState, to: ScenarioState) -> bool {
        from.can_advance(to)
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut tracker = ScenarioTracker::new();
        for next in [
            ScenarioState::Setup,
            ScenarioState::Running,
            ScenarioState::Passed,
            ScenarioState::TornDown,
        ] {
            tracker.advance(next).unwrap();
        }
        assert_eq!(tracker.state(), ScenarioState::TornDown);
    }

    #[test]
    fn teardown_is_reachable_from_every_non_idle_state() {
        for state in [
            ScenarioState::Setup,
            ScenarioState::Running,
            ScenarioState::Passed,
            ScenarioState::Failed,
            ScenarioState::Errored,
        ] {
            assert!(state.can_advance(ScenarioState::TornDown), "{state}");
        }
        assert!(!ScenarioState::Idle.can_advance(ScenarioState::TornDown));
    }

    #[test]
    fn setup_may_error_without_running() {
        let mut tracker = ScenarioTracker::new();
        tracker.advance(ScenarioState::Setup).unwrap();
        tracker.advance(ScenarioState::Errored).unwrap();
        tracker.advance(ScenarioState::TornDown).unwrap();
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut tracker = ScenarioTracker::new();
        let err = tracker.advance(ScenarioState::Running).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidTransition { .. }));

        tracker.advance(ScenarioState::Setup).unwrap();
        assert!(tracker.advance(ScenarioState::Passed).is_err());
    }

    #[test]
    fn verdict_classifies_assertion_vs_fault() {
        let timeout = HarnessError::ConditionTimeout {
            condition: "align attribute".into(),
            last_observed: "\"left\"".into(),
        };
        assert!(matches!(
            Verdict::from_step_error("proxy check", &timeout),
            Verdict::Failed { .. }
        ));

        let fault = HarnessError::ElementNotFound("#AlignLeft".into());
        assert!(matches!(
            Verdict::from_step_error("open panel", &fault),
            Verdict::Errored { .. }
        ));
    }

    #[test]
    fn scenario_collects_steps_in_order() {
        let scenario = Scenario::new("align-block", "alignment_options.ods")
            .step("open panel", |_ctx| Box::pin(async { Ok(()) }))
            .step("apply block alignment", |_ctx| Box::pin(async { Ok(()) }));
        assert_eq!(
            scenario.step_names(),
            vec!["open panel", "apply block alignment"]
        );
        assert!(scenario.known_broken.is_none());
    }
}
