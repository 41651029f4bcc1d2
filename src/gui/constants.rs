//! GUI-specific constants for layout and status colors

/// Settings window dimensions
pub const WINDOW_WIDTH: f32 = 600.0;
pub const WINDOW_HEIGHT: f32 = 700.0;
pub const WINDOW_MIN_WIDTH: f32 = 420.0;
pub const WINDOW_MIN_HEIGHT: f32 = 360.0;

/// Layout spacing
pub const SECTION_SPACING: f32 = 15.0;
pub const ITEM_SPACING: f32 = 8.0;

/// Height kept free under the tab contents for the footer
pub const FOOTER_RESERVED_HEIGHT: f32 = 40.0;

pub const PATH_INPUT_WIDTH: f32 = 260.0;

/// Rows shown by the advanced (raw JSON) editor
pub const ADVANCED_EDITOR_ROWS: usize = 20;

/// Status colors
pub const STATUS_OK: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_ERROR: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);
pub const STATUS_INFO: egui::Color32 = egui::Color32::from_rgb(200, 200, 0);
