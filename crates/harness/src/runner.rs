//! Suite orchestration - manifest, per-scenario execution, reporting
//!
//! The runner owns the editor server and the fixture store, executes each
//! scenario in its own browser session, and aggregates verdicts into a
//! machine-readable report plus a process exit status. Scenarios may run in
//! parallel sessions (`max_sessions`), but each session's steps execute
//! strictly sequentially.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::HarnessResult;
use crate::fixture::FixtureStore;
use crate::poll::PollConfig;
use crate::scenario::{Scenario, ScenarioState, ScenarioTracker, StepContext, Verdict};
use crate::server::{ServerConfig, ServerHandle};
use crate::session::{Session, SessionConfig};

/// Suite manifest, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Directory of pristine fixture documents
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: PathBuf,

    /// Directory for reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Editor server to attach to; superseded by `server` when set
    #[serde(default)]
    pub base_url: Option<String>,

    /// Editor server to spawn
    #[serde(default)]
    pub server: Option<ServerSettings>,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub poll: PollSettings,

    /// Concurrent browser sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Scenario names to skip without running
    #[serde(default)]
    pub skip: Vec<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            fixture_dir: default_fixture_dir(),
            output_dir: default_output_dir(),
            base_url: None,
            server: None,
            session: SessionSettings::default(),
            poll: PollSettings::default(),
            max_sessions: default_max_sessions(),
            skip: Vec::new(),
        }
    }
}

impl SuiteConfig {
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

fn default_fixture_dir() -> PathBuf {
    PathBuf::from("fixtures")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_max_sessions() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub binary_path: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_startup_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            deadline_ms: 10_000,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_poll_deadline_ms() -> u64 {
    10_000
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub state: ScenarioState,
    pub duration_ms: u64,
    pub steps_run: usize,
}

/// Result of running the whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: String,
    pub started_at: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub records: Vec<ScenarioRecord>,
}

impl SuiteReport {
    pub fn from_records(
        run_id: String,
        started_at: String,
        duration_ms: u64,
        records: Vec<ScenarioRecord>,
    ) -> Self {
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;
        let mut skipped = 0;
        for record in &records {
            match record.verdict {
                Verdict::Passed => passed += 1,
                Verdict::Failed { .. } => failed += 1,
                Verdict::Errored { .. } => errored += 1,
                Verdict::Skipped { .. } => skipped += 1,
            }
        }
        Self {
            run_id,
            started_at,
            total: records.len(),
            passed,
            failed,
            errored,
            skipped,
            duration_ms,
            records,
        }
    }

    pub fn all_green(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Zero on all-pass (skips allowed), non-zero otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_green() {
            0
        } else {
            1
        }
    }
}

/// Runs scenarios against a live editor server.
pub struct SuiteRunner {
    config: SuiteConfig,
    fixtures: FixtureStore,
    server: Option<ServerHandle>,
}

impl SuiteRunner {
    pub fn new(config: SuiteConfig) -> HarnessResult<Self> {
        let fixtures = FixtureStore::open(&config.fixture_dir)?;
        Ok(Self {
            config,
            fixtures,
            server: None,
        })
    }

    /// Spawn the editor server when the manifest asks for one.
    pub async fn start_server(&mut self) -> HarnessResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        let Some(settings) = &self.config.server else {
            return Ok(());
        };

        let server = ServerHandle::spawn(ServerConfig {
            binary_path: settings.binary_path.clone(),
            doc_root: std::env::temp_dir(),
            port: settings.port,
            startup_timeout: Duration::from_secs(settings.startup_timeout_secs),
        })
        .await?;
        self.server = Some(server);
        Ok(())
    }

    pub fn stop_server(&mut self) -> HarnessResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        if let Some(server) = &self.server {
            return server.base_url().to_string();
        }
        self.config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:9980".to_string())
    }

    /// Run every scenario and aggregate the verdicts.
    pub async fn run(&mut self, scenarios: Vec<Scenario>) -> HarnessResult<SuiteReport> {
        let start = std::time::Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let run_id = uuid::Uuid::new_v4().to_string();

        self.start_server().await?;

        info!("running {} scenario(s)...", scenarios.len());

        let this = &*self;
        let records: Vec<ScenarioRecord> = futures::stream::iter(
            scenarios.iter().map(|scenario| this.run_scenario(scenario)),
        )
        .buffered(self.config.max_sessions.max(1))
        .collect()
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = SuiteReport::from_records(run_id, started_at, duration_ms, records);

        info!("");
        info!(
            "Suite results: {} passed, {} failed, {} errored, {} skipped ({} ms)",
            report.passed, report.failed, report.errored, report.skipped, report.duration_ms
        );

        Ok(report)
    }

    async fn run_scenario(&self, scenario: &Scenario) -> ScenarioRecord {
        let start = std::time::Instant::now();

        if let Some(reason) = &scenario.known_broken {
            info!("- {} skipped (known broken: {})", scenario.name, reason);
            return ScenarioRecord {
                name: scenario.name.clone(),
                verdict: Verdict::Skipped {
                    reason: format!("known broken: {reason}"),
                },
                state: ScenarioState::Idle,
                duration_ms: 0,
                steps_run: 0,
            };
        }
        if self.config.skip.contains(&scenario.name) {
            info!("- {} skipped (manifest)", scenario.name);
            return ScenarioRecord {
                name: scenario.name.clone(),
                verdict: Verdict::Skipped {
                    reason: "skipped by manifest".into(),
                },
                state: ScenarioState::Idle,
                duration_ms: 0,
                steps_run: 0,
            };
        }

        let mut tracker = ScenarioTracker::new();
        let mut steps_run = 0usize;

        let verdict = match self.setup(scenario, &mut tracker).await {
            Ok(mut ctx) => {
                let verdict = self
                    .execute_steps(scenario, &mut ctx, &mut tracker, &mut steps_run)
                    .await;
                // Teardown runs on every path, pass or fail.
                ctx.teardown().await;
                verdict
            }
            Err(e) => {
                let _ = tracker.advance(ScenarioState::Errored);
                Verdict::Errored {
                    reason: format!("setup: {e}"),
                }
            }
        };

        let _ = tracker.advance(ScenarioState::TornDown);
        let duration_ms = start.elapsed().as_millis() as u64;

        match &verdict {
            Verdict::Passed => info!("✓ {} ({} ms)", scenario.name, duration_ms),
            Verdict::Failed { reason } => error!("✗ {} - {}", scenario.name, reason),
            Verdict::Errored { reason } => error!("✗ {} [harness] - {}", scenario.name, reason),
            Verdict::Skipped { .. } => {}
        }

        ScenarioRecord {
            name: scenario.name.clone(),
            verdict,
            state: tracker.state(),
            duration_ms,
            steps_run,
        }
    }

    async fn setup(
        &self,
        scenario: &Scenario,
        tracker: &mut ScenarioTracker,
    ) -> HarnessResult<StepContext> {
        tracker.advance(ScenarioState::Setup)?;
        debug!("setup: {} ({})", scenario.name, scenario.fixture);

        let checkout = self.fixtures.checkout(&scenario.fixture)?;
        let session = Session::launch(&self.session_config()).await?;
        let url = doc_url(&self.base_url(), checkout.path());
        session.goto(&url).await?;

        Ok(StepContext::new(session, self.poll_config(), checkout))
    }

    async fn execute_steps(
        &self,
        scenario: &Scenario,
        ctx: &mut StepContext,
        tracker: &mut ScenarioTracker,
        steps_run: &mut usize,
    ) -> Verdict {
        if let Err(e) = tracker.advance(ScenarioState::Running) {
            return Verdict::Errored {
                reason: e.to_string(),
            };
        }

        for step in &scenario.steps {
            debug!("step: {}", step.name);
            match (step.run)(ctx).await {
                Ok(()) => *steps_run += 1,
                Err(e) => {
                    let verdict = Verdict::from_step_error(&step.name, &e);
                    let _ = tracker.advance(verdict.terminal_state());
                    return verdict;
                }
            }
        }

        let _ = tracker.advance(ScenarioState::Passed);
        Verdict::Passed
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            headless: self.config.session.headless,
            viewport_width: self.config.session.viewport_width,
            viewport_height: self.config.session.viewport_height,
            chrome_executable: None,
        }
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.config.poll.interval_ms),
            Duration::from_millis(self.config.poll.deadline_ms),
        )
    }

    /// Write the suite report as pretty JSON.
    pub fn write_report(&self, report: &SuiteReport) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("suite-report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("report written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for SuiteRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Address of a working copy inside the editor.
pub fn doc_url(base_url: &str, working_copy: &Path) -> String {
    format!(
        "{}/?file_path=file://{}&permission=edit",
        base_url.trim_end_matches('/'),
        working_copy.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_uses_defaults() {
        let config = SuiteConfig::from_yaml("{}").unwrap();
        assert_eq!(config.fixture_dir, PathBuf::from("fixtures"));
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
        assert!(config.base_url.is_none());
        assert!(config.server.is_none());
        assert!(config.session.headless);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.deadline_ms, 10_000);
        assert_eq!(config.max_sessions, 1);
        assert!(config.skip.is_empty());
    }

    #[test]
    fn full_manifest_round_trips() {
        let yaml = r#"
fixture_dir: data/fixtures
output_dir: out
base_url: http://127.0.0.1:9980
session:
  headless: false
  viewport_width: 390
  viewport_height: 844
poll:
  interval_ms: 100
  deadline_ms: 20000
max_sessions: 3
skip:
  - apply-stacked-option
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.fixture_dir, PathBuf::from("data/fixtures"));
        assert!(!config.session.headless);
        assert_eq!(config.session.viewport_width, 390);
        assert_eq!(config.poll.deadline_ms, 20_000);
        assert_eq!(config.max_sessions, 3);
        assert_eq!(config.skip, vec!["apply-stacked-option".to_string()]);
    }

    #[test]
    fn manifest_server_block_parses() {
        let yaml = r#"
server:
  binary_path: target/debug/editor-server
  port: 9980
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.binary_path, PathBuf::from("target/debug/editor-server"));
        assert_eq!(server.port, Some(9980));
        assert_eq!(server.startup_timeout_secs, 30);
    }

    #[test]
    fn report_counts_verdicts() {
        let records = vec![
            ScenarioRecord {
                name: "a".into(),
                verdict: Verdict::Passed,
                state: ScenarioState::TornDown,
                duration_ms: 10,
                steps_run: 3,
            },
            ScenarioRecord {
                name: "b".into(),
                verdict: Verdict::Failed {
                    reason: "align attribute never became \"right\"".into(),
                },
                state: ScenarioState::TornDown,
                duration_ms: 10_000,
                steps_run: 1,
            },
            ScenarioRecord {
                name: "c".into(),
                verdict: Verdict::Skipped {
                    reason: "known broken: spinfield disabled".into(),
                },
                state: ScenarioState::Idle,
                duration_ms: 0,
                steps_run: 0,
            },
        ];
        let report =
            SuiteReport::from_records("run-1".into(), "2026-01-01T00:00:00Z".into(), 42, records);
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errored, 0);
        assert_eq!(report.skipped, 1);
        assert!(!report.all_green());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn skips_do_not_fail_the_suite() {
        let records = vec![ScenarioRecord {
            name: "a".into(),
            verdict: Verdict::Skipped {
                reason: "manifest".into(),
            },
            state: ScenarioState::Idle,
            duration_ms: 0,
            steps_run: 0,
        }];
        let report =
            SuiteReport::from_records("run-2".into(), "2026-01-01T00:00:00Z".into(), 1, records);
        assert!(report.all_green());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn doc_url_embeds_working_copy() {
        let url = doc_url("http://127.0.0.1:9980/", Path::new("/tmp/wc/alignment_options.ods"));
        assert_eq!(
            url,
            "http://127.0.0.1:9980/?file_path=file:///tmp/wc/alignment_options.ods&permission=edit"
        );
    }

    #[tokio::test]
    async fn known_broken_scenarios_are_skipped_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alignment_options.ods"), b"doc").unwrap();

        let config = SuiteConfig {
            fixture_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let mut runner = SuiteRunner::new(config).unwrap();

        let scenario = Scenario::new("indent-via-input-field", "alignment_options.ods")
            .known_broken("spinfield stays disabled");
        let report = runner.run(vec![scenario]).await.unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.exit_code(), 0);

        let path = runner.write_report(&report).unwrap();
        let json = std::fs::read_to_string(path).unwrap();
        assert!(json.contains("indent-via-input-field"));
        assert!(json.contains("known broken"));
    }
}
