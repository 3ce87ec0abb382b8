//! Command dispatch - indirect mutation of document state
//!
//! A command names a target control and an action. Dispatch waits (bounded)
//! for the target to be interactive, performs the action exactly once, and
//! returns as soon as the UI has accepted it - effects are observed only
//! through indicators. A command is never re-issued automatically: duplicate
//! dispatch could corrupt state, e.g. double-toggling a checkbox.

use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::poll::PollConfig;
use crate::session::{js_string, KeyChord, Session, SurfacePoint};

/// What to do to the target.
#[derive(Debug, Clone)]
pub enum Action {
    Click,
    KeyChord(KeyChord),
    TypeText(String),
}

/// An opaque, named request to mutate UI/document state.
#[derive(Debug, Clone)]
pub struct Command {
    pub target: String,
    pub action: Action,
}

impl Command {
    pub fn click(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: Action::Click,
        }
    }

    pub fn key_chord(target: impl Into<String>, chord: KeyChord) -> Self {
        Self {
            target: target.into(),
            action: Action::KeyChord(chord),
        }
    }

    pub fn type_text(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: Action::TypeText(text.into()),
        }
    }

    pub fn label(&self) -> String {
        match &self.action {
            Action::Click => format!("click:{}", self.target),
            Action::KeyChord(chord) => format!("key:{}@{}", chord.label(), self.target),
            Action::TypeText(_) => format!("type:{}", self.target),
        }
    }
}

/// A nested panel that must be opened before a target control is reachable.
#[derive(Debug, Clone)]
pub struct WizardSpec {
    /// Control that opens the wizard.
    pub toggle: String,
    /// Wizard container that must appear.
    pub container: String,
    /// Property panel entry inside the wizard.
    pub panel: String,
    /// First control of the panel; visible means the panel is usable.
    pub ready_marker: String,
}

#[derive(Debug, Deserialize)]
struct ReadyReply {
    status: String,
}

/// Dispatches commands against a live session.
pub struct Dispatcher<'a> {
    session: &'a Session,
    readiness: PollConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(session: &'a Session, readiness: PollConfig) -> Self {
        Self { session, readiness }
    }

    /// Wait for the target to be interactive, then perform the action once.
    pub async fn dispatch(&self, command: &Command) -> HarnessResult<()> {
        debug!("dispatch {}", command.label());
        self.wait_interactive(&command.target).await?;

        match &command.action {
            Action::Click => {
                self.session.click(&command.target).await?;
            }
            Action::KeyChord(chord) => {
                self.session.key_chord(chord).await?;
            }
            Action::TypeText(text) => {
                self.session.type_text(&command.target, text).await?;
            }
        }
        Ok(())
    }

    /// Trusted click at a surface point (coordinates into the canvas), with
    /// the container's readiness awaited first.
    pub async fn click_surface(&self, point: &SurfacePoint, click_count: i64) -> HarnessResult<()> {
        debug!("dispatch surface-click:{}+({},{})", point.selector, point.x, point.y);
        self.wait_visible(&point.selector).await?;
        self.session.click_at(point, click_count).await
    }

    /// Open a wizard panel: toggle, wait for the container, enter the named
    /// panel, wait for its first control. Each stage is a command with its
    /// own readiness wait.
    pub async fn open_wizard(&self, wizard: &WizardSpec) -> HarnessResult<()> {
        self.dispatch(&Command::click(&wizard.toggle)).await?;
        self.wait_visible(&wizard.container).await?;
        self.dispatch(&Command::click(&wizard.panel)).await?;
        self.wait_visible(&wizard.ready_marker).await?;
        Ok(())
    }

    /// Bounded wait for an element to be rendered.
    pub async fn wait_visible(&self, selector: &str) -> HarnessResult<()> {
        self.wait_for_status(selector, false).await
    }

    /// Bounded wait for an element to be rendered and not disabled.
    pub async fn wait_interactive(&self, selector: &str) -> HarnessResult<()> {
        self.wait_for_status(selector, true).await
    }

    async fn wait_for_status(&self, selector: &str, need_enabled: bool) -> HarnessResult<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return {{ status: 'missing' }};
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden')
                    return {{ status: 'hidden' }};
                if (el.disabled || el.getAttribute('disabled') !== null)
                    return {{ status: 'disabled' }};
                return {{ status: 'ready' }};
            }})()"#,
            sel = js_string(selector),
        );

        let start = Instant::now();
        let deadline = start + self.readiness.deadline;

        loop {
            let reply: ReadyReply = self.session.eval(&js).await?;
            let ready = match reply.status.as_str() {
                "ready" => true,
                "disabled" => !need_enabled,
                _ => false,
            };
            if ready {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::ElementNeverReady {
                    selector: selector.to_string(),
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
            sleep(self.readiness.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_action_and_target() {
        assert_eq!(Command::click("#AlignLeft").label(), "click:#AlignLeft");
        assert_eq!(
            Command::key_chord("#map", KeyChord::ctrl('a')).label(),
            "key:Ctrl+a@#map"
        );
        assert_eq!(
            Command::type_text("#leftindent .spinfield", "20").label(),
            "type:#leftindent .spinfield"
        );
    }
}
