//! Sheetcheck verification harness
//!
//! A browser-driven harness that verifies formatting behavior of a tiled
//! document editor through observable proxies. The editor is an external
//! collaborator; the harness drives it indirectly and never reads its
//! document model. Timing nondeterminism between a command and its visible
//! effect is resolved by bounded polling and aliasing, never by scattered
//! fixed sleeps.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SuiteRunner                              │
//! │    ├── ServerHandle      spawn + health-check the editor    │
//! │    ├── FixtureStore      pristine docs -> working copies    │
//! │    └── per scenario:                                        │
//! │         Session (CDP)                                       │
//! │           ├── Dispatcher   readiness wait, dispatch once    │
//! │           ├── Extractor    probes -> Indicator snapshots    │
//! │           │     └── poll_for  bounded retry, no flat sleeps │
//! │           └── AliasStore   sentinel-initialized captures    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario: Setup -> Running -> {Passed,Failed,Errored}      │
//! │            -> TornDown  (teardown on every exit path)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod alias;
pub mod command;
pub mod error;
pub mod fixture;
pub mod indicator;
pub mod poll;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod session;

pub use alias::AliasStore;
pub use command::{Action, Command, Dispatcher, WizardSpec};
pub use error::{HarnessError, HarnessResult};
pub use fixture::{FixtureCheckout, FixtureStore};
pub use indicator::{Extractor, Indicator, Probe};
pub use poll::{degraded_wait, poll_for, poll_until, PollConfig, Sample};
pub use runner::{doc_url, ScenarioRecord, SuiteConfig, SuiteReport, SuiteRunner};
pub use scenario::{Scenario, ScenarioState, StepContext, StepFuture, Verdict};
pub use server::{ServerConfig, ServerHandle};
pub use session::{skip_browser, KeyChord, Session, SessionConfig, SurfacePoint};
