//! Sheet interaction helpers shared by the alignment scenarios
//!
//! Cells on the tiled canvas have no DOM nodes of their own, so the first
//! cell and the row header are addressed as surface points. Everything here
//! takes the scenario-scoped [`StepContext`]; nothing holds ambient state.

use sheetcheck_harness::{
    poll_for, Command, HarnessError, HarnessResult, KeyChord, Probe, Sample, StepContext,
    SurfacePoint, WizardSpec,
};

use crate::selectors;

/// Fixture with known initial content for every alignment scenario.
pub const FIXTURE: &str = "alignment_options.ods";

/// The first cell (A1), addressed as an offset into the map viewport.
pub fn first_cell() -> SurfacePoint {
    SurfacePoint::new(selectors::MAP, 20.0, 15.0)
}

/// The wizard chain that exposes the alignment controls.
pub fn alignment_wizard() -> WizardSpec {
    WizardSpec {
        toggle: selectors::HAMBURGER.into(),
        container: selectors::MOBILE_WIZARD.into(),
        panel: selectors::ALIGNMENT_PANEL.into(),
        ready_marker: selectors::ALIGN_LEFT.into(),
    }
}

/// Proxy attribute and exact value produced by each alignment command.
pub fn proxy_alignment(button: &str) -> Option<(&'static str, &'static str)> {
    match button {
        selectors::ALIGN_LEFT => Some(("align", "left")),
        selectors::ALIGN_RIGHT => Some(("align", "right")),
        selectors::ALIGN_HORIZONTAL_CENTER => Some(("align", "center")),
        selectors::ALIGN_BLOCK => Some(("align", "justify")),
        selectors::ALIGN_TOP => Some(("valign", "top")),
        selectors::ALIGN_VCENTER => Some(("valign", "middle")),
        selectors::ALIGN_BOTTOM => Some(("valign", "bottom")),
        _ => None,
    }
}

/// Switch the freshly loaded document into edit mode.
pub async fn enter_edit_mode(ctx: &StepContext) -> HarnessResult<()> {
    ctx.dispatch(&Command::click(selectors::EDIT_BUTTON)).await?;
    ctx.wait_visible(selectors::MAP).await
}

/// Focus the first cell and open the alignment property panel.
pub async fn open_alignment_panel(ctx: &StepContext) -> HarnessResult<()> {
    ctx.click_surface(&first_cell(), 1).await?;
    ctx.open_wizard(&alignment_wizard()).await
}

/// Select the sheet content so the editor publishes it to the
/// serialized-content proxy.
pub async fn select_all(ctx: &StepContext) -> HarnessResult<()> {
    ctx.click_surface(&first_cell(), 1).await?;
    ctx.key_chord(&KeyChord::ctrl('a')).await
}

/// Select the full first row via the row header.
pub async fn select_first_row(ctx: &StepContext) -> HarnessResult<()> {
    ctx.click_surface(&SurfacePoint::new(selectors::ROW_HEADER, 10.0, 10.0), 1)
        .await
}

/// One sample of the text-position indicator (select -> read -> deselect
/// happens inside the probe).
pub async fn sample_text_position(ctx: &StepContext) -> HarnessResult<f64> {
    let probe = Probe::selection_edge(first_cell(), selectors::SELECTION_MARKER_END);
    ctx.extract(&probe).await?.as_numeric().ok_or_else(|| {
        HarnessError::UnsupportedIndicator("text position read did not yield a number".into())
    })
}

/// The text position once it reports a plausible value. A zero or negative
/// offset means the selection has not landed yet.
pub async fn settled_text_position(ctx: &StepContext) -> HarnessResult<f64> {
    poll_for(&ctx.poll, "text position reported", || async move {
        let pos = sample_text_position(ctx).await?;
        if pos > 0.0 {
            Ok(Sample::Ready(pos))
        } else {
            Ok(Sample::pending(pos))
        }
    })
    .await
}

/// Re-select the content and poll the serialized-content proxy until the
/// named attribute holds the exact expected value.
pub async fn expect_proxy_attribute(
    ctx: &StepContext,
    name: &'static str,
    expected: &'static str,
) -> HarnessResult<()> {
    select_all(ctx).await?;
    let condition = format!("proxy cell {name} = {expected:?}");
    poll_for(&ctx.poll, &condition, || async move {
        let probe = Probe::clipboard_attribute(selectors::COPY_PASTE_CELL, name);
        let got = ctx.extract(&probe).await?;
        match got.as_text() {
            Some(value) if value == expected => Ok(Sample::Ready(())),
            _ => Ok(Sample::pending(got)),
        }
    })
    .await
}

/// Apply an alignment command and verify its exact proxy value.
pub async fn apply_and_verify_alignment(
    ctx: &StepContext,
    button: &'static str,
) -> HarnessResult<()> {
    let (attr, expected) = proxy_alignment(button).ok_or_else(|| {
        HarnessError::UnsupportedIndicator(format!("no proxy mapping for {button}"))
    })?;
    open_alignment_panel(ctx).await?;
    ctx.dispatch(&Command::click(button)).await?;
    expect_proxy_attribute(ctx, attr, expected).await
}

/// Poll a checkbox's `checked` property until it matches.
pub async fn expect_checkbox(
    ctx: &StepContext,
    selector: &'static str,
    expected: bool,
) -> HarnessResult<()> {
    let condition = format!("{selector} checked = {expected}");
    poll_for(&ctx.poll, &condition, || async move {
        let probe = Probe::property(selector, "checked");
        let got = ctx.extract(&probe).await?;
        match got.as_flag() {
            Some(value) if value == expected => Ok(Sample::Ready(())),
            _ => Ok(Sample::pending(got)),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(selectors::ALIGN_LEFT, "align", "left"; "left")]
    #[test_case(selectors::ALIGN_RIGHT, "align", "right"; "right")]
    #[test_case(selectors::ALIGN_HORIZONTAL_CENTER, "align", "center"; "center horizontal")]
    #[test_case(selectors::ALIGN_BLOCK, "align", "justify"; "block maps to justify")]
    #[test_case(selectors::ALIGN_TOP, "valign", "top"; "top")]
    #[test_case(selectors::ALIGN_VCENTER, "valign", "middle"; "center vertical maps to middle")]
    #[test_case(selectors::ALIGN_BOTTOM, "valign", "bottom"; "bottom")]
    fn alignment_commands_map_to_exact_proxy_values(
        button: &str,
        attr: &'static str,
        value: &'static str,
    ) {
        assert_eq!(proxy_alignment(button), Some((attr, value)));
    }

    #[test]
    fn unknown_buttons_have_no_proxy_mapping() {
        assert_eq!(proxy_alignment(selectors::INCREMENT_INDENT), None);
        assert_eq!(proxy_alignment("#NoSuchControl"), None);
    }

    #[test]
    fn first_cell_sits_inside_the_viewport_origin() {
        let cell = first_cell();
        assert_eq!(cell.selector, selectors::MAP);
        assert!(cell.x > 0.0 && cell.y > 0.0);
    }

    #[test]
    fn wizard_chain_ends_at_the_alignment_controls() {
        let wizard = alignment_wizard();
        assert_eq!(wizard.panel, selectors::ALIGNMENT_PANEL);
        assert_eq!(wizard.ready_marker, selectors::ALIGN_LEFT);
    }
}
