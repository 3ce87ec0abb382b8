//! The alignment scenario catalog
//!
//! Each scenario drives one formatting behavior of the sheet surface and
//! verifies it through the serialized-content proxy or the text-position
//! indicator. Indent assertions are deliberately loose (strictly greater /
//! strictly less than the aliased capture): the editor's indent step size is
//! implementation-defined and not part of the observable contract.

use std::time::Duration;

use sheetcheck_harness::{
    degraded_wait, poll_for, Command, HarnessError, Indicator, Sample, Scenario, StepContext,
    StepFuture,
};

use crate::selectors;
use crate::sheet::{self, FIXTURE};

const ORIGINAL_TEXT_POS: &str = "originalTextPos";

/// Every scenario of the suite, in catalog order.
pub fn scenarios() -> Vec<Scenario> {
    vec![
        apply_left_right_alignment(),
        align_center_horizontal(),
        align_block(),
        writing_direction_toggle(),
        align_top_bottom(),
        align_center_vertical(),
        indent_increment_decrement(),
        indent_via_input_field(),
        enable_text_wrapping(),
        apply_stacked_option(),
        merge_cells(),
    ]
}

fn editing(name: &str) -> Scenario {
    Scenario::new(name, FIXTURE).step("enter edit mode", |ctx| {
        Box::pin(sheet::enter_edit_mode(ctx))
    })
}

/// Capture the current text position into the alias, starting from a fresh
/// sentinel so a missed capture can never masquerade as a real value.
fn capture_text_position(ctx: &mut StepContext) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.aliases.init(ORIGINAL_TEXT_POS);
        let pos = sheet::settled_text_position(ctx).await?;
        ctx.aliases.capture(ORIGINAL_TEXT_POS, Indicator::Numeric(pos));
        Ok(())
    })
}

fn aliased_text_position(ctx: &StepContext) -> Result<f64, HarnessError> {
    ctx.aliases
        .value(ORIGINAL_TEXT_POS)?
        .as_numeric()
        .ok_or_else(|| {
            HarnessError::UnsupportedIndicator("text position alias is not numeric".into())
        })
}

/// Poll until the text position has strictly increased past the alias.
fn expect_position_increased(ctx: &mut StepContext) -> StepFuture<'_> {
    Box::pin(async move {
        let original = aliased_text_position(ctx)?;
        let ctx = &*ctx;
        poll_for(&ctx.poll, "text position beyond prior capture", || async move {
            let pos = sheet::sample_text_position(ctx).await?;
            if pos > original {
                Ok(Sample::Ready(()))
            } else {
                Ok(Sample::pending(pos))
            }
        })
        .await
    })
}

/// Poll until the text position has strictly decreased below the alias.
fn expect_position_decreased(ctx: &mut StepContext) -> StepFuture<'_> {
    Box::pin(async move {
        let original = aliased_text_position(ctx)?;
        let ctx = &*ctx;
        poll_for(&ctx.poll, "text position below prior capture", || async move {
            let pos = sheet::sample_text_position(ctx).await?;
            if pos < original {
                Ok(Sample::Ready(()))
            } else {
                Ok(Sample::pending(pos))
            }
        })
        .await
    })
}

fn apply_left_right_alignment() -> Scenario {
    editing("apply-left-right-alignment")
        .step("right alignment lands in the proxy", |ctx| {
            Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_RIGHT))
        })
        .step("left alignment lands in the proxy", |ctx| {
            Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_LEFT))
        })
}

fn align_center_horizontal() -> Scenario {
    editing("align-center-horizontal").step("horizontal centering lands in the proxy", |ctx| {
        Box::pin(sheet::apply_and_verify_alignment(
            ctx,
            selectors::ALIGN_HORIZONTAL_CENTER,
        ))
    })
}

fn align_block() -> Scenario {
    editing("align-block").step("block alignment lands in the proxy as justify", |ctx| {
        Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_BLOCK))
    })
}

fn writing_direction_toggle() -> Scenario {
    editing("writing-direction-toggle")
        .step("open alignment panel", |ctx| {
            Box::pin(sheet::open_alignment_panel(ctx))
        })
        .step("switch to right-to-left", |ctx| {
            Box::pin(async move {
                ctx.dispatch(&Command::click(selectors::PARA_RIGHT_TO_LEFT))
                    .await?;
                degraded_wait(
                    "writing direction is not exposed by the serialized-content proxy",
                    Duration::from_millis(500),
                )
                .await;
                Ok(())
            })
        })
        .step("switch back to left-to-right", |ctx| {
            Box::pin(async move {
                ctx.dispatch(&Command::click(selectors::PARA_LEFT_TO_RIGHT))
                    .await?;
                degraded_wait(
                    "writing direction is not exposed by the serialized-content proxy",
                    Duration::from_millis(500),
                )
                .await;
                Ok(())
            })
        })
}

fn align_top_bottom() -> Scenario {
    editing("align-top-bottom")
        .step("top alignment lands in the proxy", |ctx| {
            Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_TOP))
        })
        .step("bottom alignment lands in the proxy", |ctx| {
            Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_BOTTOM))
        })
}

fn align_center_vertical() -> Scenario {
    editing("align-center-vertical").step("vertical centering lands in the proxy as middle", |ctx| {
        Box::pin(sheet::apply_and_verify_alignment(ctx, selectors::ALIGN_VCENTER))
    })
}

fn indent_increment_decrement() -> Scenario {
    editing("indent-increment-decrement")
        .step("capture baseline text position", capture_text_position)
        .step("increment indent", |ctx| {
            Box::pin(async move {
                sheet::open_alignment_panel(ctx).await?;
                ctx.dispatch(&Command::click(selectors::INCREMENT_INDENT)).await
            })
        })
        .step("text position increased", expect_position_increased)
        .step("re-capture text position", capture_text_position)
        .step("decrement indent", |ctx| {
            Box::pin(async move {
                sheet::open_alignment_panel(ctx).await?;
                ctx.dispatch(&Command::click(selectors::DECREMENT_INDENT)).await
            })
        })
        .step("text position decreased", expect_position_decreased)
}

fn indent_via_input_field() -> Scenario {
    editing("indent-via-input-field")
        .known_broken("left indent spinfield stays disabled after opening the panel")
        .step("capture baseline text position", capture_text_position)
        .step("bump indent twice to enable the spinfield", |ctx| {
            Box::pin(async move {
                sheet::open_alignment_panel(ctx).await?;
                ctx.dispatch(&Command::click(selectors::INCREMENT_INDENT)).await?;
                ctx.dispatch(&Command::click(selectors::INCREMENT_INDENT)).await
            })
        })
        .step("set indent through the spinfield", |ctx| {
            Box::pin(async move {
                sheet::open_alignment_panel(ctx).await?;
                ctx.wait_interactive(selectors::LEFT_INDENT_SPINFIELD).await?;
                ctx.dispatch(&Command::type_text(
                    selectors::LEFT_INDENT_SPINFIELD,
                    "20\n",
                ))
                .await
            })
        })
        .step("text position increased", expect_position_increased)
}

fn enable_text_wrapping() -> Scenario {
    editing("enable-text-wrapping")
        .step("capture baseline text position", capture_text_position)
        .step("open alignment panel", |ctx| {
            Box::pin(sheet::open_alignment_panel(ctx))
        })
        .step("wrap starts unchecked", |ctx| {
            Box::pin(sheet::expect_checkbox(ctx, selectors::WRAP_TEXT, false))
        })
        .step("toggle wrap", |ctx| {
            Box::pin(async move {
                ctx.dispatch(&Command::click(selectors::WRAP_TEXT)).await
            })
        })
        .step("wrap reports checked", |ctx| {
            Box::pin(sheet::expect_checkbox(ctx, selectors::WRAP_TEXT, true))
        })
        // The wrapped first line is narrower, so the selection edge pulls
        // back toward the cell origin.
        .step("text position decreased", expect_position_decreased)
}

fn apply_stacked_option() -> Scenario {
    editing("apply-stacked-option")
        .step("open alignment panel", |ctx| {
            Box::pin(sheet::open_alignment_panel(ctx))
        })
        .step("stacked starts unchecked", |ctx| {
            Box::pin(sheet::expect_checkbox(ctx, selectors::STACKED, false))
        })
        .step("toggle stacked", |ctx| {
            Box::pin(async move { ctx.dispatch(&Command::click(selectors::STACKED)).await })
        })
        .step("stacked reports checked", |ctx| {
            Box::pin(sheet::expect_checkbox(ctx, selectors::STACKED, true))
        })
        .step("allow stacked rendering to settle", |_ctx| {
            Box::pin(async {
                degraded_wait(
                    "stacked text moves neither the text position nor the proxy",
                    Duration::from_millis(500),
                )
                .await;
                Ok(())
            })
        })
}

fn merge_cells() -> Scenario {
    editing("merge-cells")
        .step("select the full first row", |ctx| {
            Box::pin(async move {
                sheet::select_first_row(ctx).await?;
                degraded_wait(
                    "row selection publishes no signal that merge may proceed",
                    Duration::from_millis(1000),
                )
                .await;
                Ok(())
            })
        })
        .step("open alignment panel on the selection", |ctx| {
            Box::pin(async move { ctx.open_wizard(&sheet::alignment_wizard()).await })
        })
        .step("merge control is enabled and unchecked", |ctx| {
            Box::pin(async move {
                ctx.wait_interactive(selectors::MERGE_CELLS).await?;
                sheet::expect_checkbox(ctx, selectors::MERGE_CELLS, false).await
            })
        })
        .step("toggle merge", |ctx| {
            Box::pin(async move { ctx.dispatch(&Command::click(selectors::MERGE_CELLS)).await })
        })
        .step("merge reports checked", |ctx| {
            Box::pin(sheet::expect_checkbox(ctx, selectors::MERGE_CELLS, true))
        })
        // The sheet is 1024 columns wide; a merged full row collapses into
        // one cell spanning all of them.
        .step("proxy reports colspan=1024", |ctx| {
            Box::pin(sheet::expect_proxy_attribute(ctx, "colspan", "1024"))
        })
}
