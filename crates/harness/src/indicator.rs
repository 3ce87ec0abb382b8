//! Indicator extraction - observable proxy values for document state
//!
//! The document model behind the editor has no direct accessor from the
//! harness's side, so every assertion reads a proxy: a DOM attribute, a DOM
//! property, an attribute of the serialized-content container, or the visual
//! boundary of a forced text selection. A [`Probe`] describes what to
//! observe; [`Extractor::extract`] samples it and returns an immutable
//! [`Indicator`] snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HarnessError, HarnessResult};
use crate::poll::{poll_for, PollConfig, Sample};
use crate::session::{js_string, KeyChord, Session, SurfacePoint};

/// A typed snapshot of observable UI/document state, immutable once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Indicator {
    Numeric(f64),
    Text(String),
    Flag(bool),
}

impl Indicator {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Indicator::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Indicator::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Indicator::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Numeric(v) => write!(f, "{v}"),
            Indicator::Text(s) => write!(f, "{s:?}"),
            Indicator::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Description of a state observation.
#[derive(Debug, Clone)]
pub enum Probe {
    /// A DOM attribute on a visible element.
    Attribute { selector: String, name: String },

    /// A DOM property (e.g. `checked`) on a visible element.
    Property { selector: String, name: String },

    /// An attribute of the serialized-content proxy cell. The container is
    /// an off-screen side channel, so no visibility requirement applies.
    ClipboardAttribute { selector: String, name: String },

    /// The horizontal offset of the selection end marker after forcing a
    /// deterministic selection inside the target cell. This is the
    /// text-position proxy standing in for the indent level, which has no
    /// direct accessor; keeping it a distinct kind makes a future direct
    /// accessor a localized change.
    SelectionEdge {
        cell: SurfacePoint,
        marker_selector: String,
    },
}

impl Probe {
    pub fn attribute(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Probe::Attribute {
            selector: selector.into(),
            name: name.into(),
        }
    }

    pub fn property(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Probe::Property {
            selector: selector.into(),
            name: name.into(),
        }
    }

    pub fn clipboard_attribute(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Probe::ClipboardAttribute {
            selector: selector.into(),
            name: name.into(),
        }
    }

    pub fn selection_edge(cell: SurfacePoint, marker_selector: impl Into<String>) -> Self {
        Probe::SelectionEdge {
            cell,
            marker_selector: marker_selector.into(),
        }
    }

    /// Human-readable description used in errors and poll diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Probe::Attribute { selector, name } => format!("attribute {name} of {selector}"),
            Probe::Property { selector, name } => format!("property {name} of {selector}"),
            Probe::ClipboardAttribute { selector, name } => {
                format!("serialized-content attribute {name} of {selector}")
            }
            Probe::SelectionEdge {
                cell,
                marker_selector,
            } => format!(
                "selection edge of {marker_selector} after selecting in {}",
                cell.selector
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReply {
    status: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RectReply {
    status: String,
    #[serde(default)]
    left: Option<f64>,
}

/// Samples probes against a live session.
pub struct Extractor<'a> {
    session: &'a Session,
    poll: PollConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(session: &'a Session, poll: PollConfig) -> Self {
        Self { session, poll }
    }

    /// Sample the probe once and return the current value.
    ///
    /// Fails with `ElementNotFound` if the probed element is absent,
    /// `ElementNotVisible` if present but not rendered (where visibility is
    /// required), and `ConditionTimeout` if a selection-edge read cannot be
    /// completed within the bounded wait.
    pub async fn extract(&self, probe: &Probe) -> HarnessResult<Indicator> {
        match probe {
            Probe::Attribute { selector, name } => {
                self.read_attribute(selector, name, true).await
            }
            Probe::ClipboardAttribute { selector, name } => {
                self.read_attribute(selector, name, false).await
            }
            Probe::Property { selector, name } => self.read_property(selector, name).await,
            Probe::SelectionEdge {
                cell,
                marker_selector,
            } => self.read_selection_edge(cell, marker_selector).await,
        }
    }

    async fn read_attribute(
        &self,
        selector: &str,
        name: &str,
        require_visible: bool,
    ) -> HarnessResult<Indicator> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return {{ status: 'missing' }};
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden')
                    return {{ status: 'hidden', value: el.getAttribute({name}) }};
                return {{ status: 'ok', value: el.getAttribute({name}) }};
            }})()"#,
            sel = js_string(selector),
            name = js_string(name),
        );
        let reply: ProbeReply = self.session.eval(&js).await?;
        self.reply_to_indicator(reply, selector, name, require_visible)
    }

    async fn read_property(&self, selector: &str, name: &str) -> HarnessResult<Indicator> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return {{ status: 'missing' }};
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden')
                    return {{ status: 'hidden' }};
                const value = el[{name}];
                return {{ status: 'ok', value: value === undefined ? null : value }};
            }})()"#,
            sel = js_string(selector),
            name = js_string(name),
        );
        let reply: ProbeReply = self.session.eval(&js).await?;
        self.reply_to_indicator(reply, selector, name, true)
    }

    fn reply_to_indicator(
        &self,
        reply: ProbeReply,
        selector: &str,
        name: &str,
        require_visible: bool,
    ) -> HarnessResult<Indicator> {
        match reply.status.as_str() {
            "missing" => Err(HarnessError::ElementNotFound(selector.to_string())),
            "hidden" if require_visible => {
                Err(HarnessError::ElementNotVisible(selector.to_string()))
            }
            _ => match reply.value {
                Some(value) => json_to_indicator(value).ok_or_else(|| {
                    HarnessError::UnsupportedIndicator(format!(
                        "{name} of {selector} is not a scalar"
                    ))
                }),
                // Attribute not present yet: report as absent so polled
                // comparisons keep retrying instead of comparing garbage.
                None => Err(HarnessError::ElementNotFound(format!(
                    "{selector}[{name}]"
                ))),
            },
        }
    }

    /// The select -> read -> deselect mini-protocol for text-position reads.
    ///
    /// Forces a deterministic selection (double-click into the cell, then
    /// select-all) so the read is reproducible, waits for the selection end
    /// marker, reads its horizontal offset, and clears the selection before
    /// returning. The whole sequence is one call; no other command can
    /// interleave within a scenario.
    async fn read_selection_edge(
        &self,
        cell: &SurfacePoint,
        marker_selector: &str,
    ) -> HarnessResult<Indicator> {
        self.session.click_at(cell, 2).await?;
        self.session.key_chord(&KeyChord::ctrl('a')).await?;

        let session = self.session;
        let read = poll_for(
            &self.poll,
            &format!("selection end marker {marker_selector} visible"),
            || {
                let js = format!(
                    r#"(() => {{
                        const el = document.querySelector({sel});
                        if (!el) return {{ status: 'missing' }};
                        const style = window.getComputedStyle(el);
                        if (style.display === 'none' || style.visibility === 'hidden')
                            return {{ status: 'hidden' }};
                        return {{ status: 'ok', left: el.getBoundingClientRect().left }};
                    }})()"#,
                    sel = js_string(marker_selector),
                );
                async move {
                    let reply: RectReply = session.eval(&js).await?;
                    match (reply.status.as_str(), reply.left) {
                        ("ok", Some(left)) => Ok(Sample::Ready(left)),
                        (status, _) => Ok(Sample::pending(format!("marker {status}"))),
                    }
                }
            },
        )
        .await;

        // Clear the selection on both outcomes so no selection state leaks
        // into the next step.
        if let Err(e) = self.session.key_chord(&KeyChord::escape()).await {
            tracing::warn!("failed to clear selection after edge read: {e}");
        }

        read.map(Indicator::Numeric)
    }
}

fn json_to_indicator(value: serde_json::Value) -> Option<Indicator> {
    match value {
        serde_json::Value::Bool(b) => Some(Indicator::Flag(b)),
        serde_json::Value::Number(n) => n.as_f64().map(Indicator::Numeric),
        serde_json::Value::String(s) => Some(Indicator::Text(s)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_by_kind() {
        assert_eq!(Indicator::Numeric(34.5).to_string(), "34.5");
        assert_eq!(Indicator::Text("right".into()).to_string(), "\"right\"");
        assert_eq!(Indicator::Flag(true).to_string(), "true");
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let n = Indicator::Numeric(1.0);
        assert_eq!(n.as_numeric(), Some(1.0));
        assert_eq!(n.as_text(), None);
        assert_eq!(n.as_flag(), None);
    }

    #[test]
    fn json_scalars_map_to_indicators() {
        assert_eq!(
            json_to_indicator(serde_json::json!("center")),
            Some(Indicator::Text("center".into()))
        );
        assert_eq!(
            json_to_indicator(serde_json::json!(true)),
            Some(Indicator::Flag(true))
        );
        assert_eq!(
            json_to_indicator(serde_json::json!(1024)),
            Some(Indicator::Numeric(1024.0))
        );
        assert_eq!(json_to_indicator(serde_json::json!({"a": 1})), None);
        assert_eq!(json_to_indicator(serde_json::json!([1])), None);
    }

    #[test]
    fn probe_descriptions_name_the_target() {
        let probe = Probe::clipboard_attribute("#copy-paste-container table td", "colspan");
        assert_eq!(
            probe.describe(),
            "serialized-content attribute colspan of #copy-paste-container table td"
        );
    }
}
