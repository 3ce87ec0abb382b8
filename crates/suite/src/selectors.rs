//! Stable element ids of the editor surface
//!
//! The suite depends on a documented contract that these ids exist and that
//! the toggles expose `disabled`/`checked` state predictably.

pub const EDIT_BUTTON: &str = "#mobile-edit-button";
pub const HAMBURGER: &str = "#toolbar-hamburger";
pub const MOBILE_WIZARD: &str = "#mobile-wizard";
pub const ALIGNMENT_PANEL: &str = "#ScAlignmentPropertyPanel";

pub const ALIGN_LEFT: &str = "#AlignLeft";
pub const ALIGN_RIGHT: &str = "#AlignRight";
pub const ALIGN_HORIZONTAL_CENTER: &str = "#AlignHorizontalCenter";
pub const ALIGN_BLOCK: &str = "#AlignBlock";
pub const ALIGN_TOP: &str = "#AlignTop";
pub const ALIGN_VCENTER: &str = "#AlignVCenter";
pub const ALIGN_BOTTOM: &str = "#AlignBottom";

pub const PARA_LEFT_TO_RIGHT: &str = "#ParaLeftToRight";
pub const PARA_RIGHT_TO_LEFT: &str = "#ParaRightToLeft";

pub const INCREMENT_INDENT: &str = "#IncrementIndent";
pub const DECREMENT_INDENT: &str = "#DecrementIndent";
pub const LEFT_INDENT_SPINFIELD: &str = "#leftindent .spinfield";

pub const WRAP_TEXT: &str = "input#wraptext";
pub const STACKED: &str = "input#stacked";
pub const MERGE_CELLS: &str = "input#mergecells";

/// The tiled map viewport hosting the sheet canvas.
pub const MAP: &str = "#map";
/// Visual end boundary of the current text selection.
pub const SELECTION_MARKER_END: &str = ".leaflet-selection-marker-end";
/// Row header strip; clicking near its top selects the first row.
pub const ROW_HEADER: &str = ".spreadsheet-header-rows";
/// Serialized-content proxy: the last copied selection as structured markup.
pub const COPY_PASTE_CELL: &str = "#copy-paste-container table td";
