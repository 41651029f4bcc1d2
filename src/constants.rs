//! Application-wide constants
//!
//! String literals and magic numbers shared by the library and the binary.

/// Config file locations used by the binary
pub mod config {
    /// Directory under the platform config dir (`~/.config` on Linux)
    pub const APP_DIR: &str = "plugin-settings";

    /// Current (user-edited) document
    pub const FILENAME: &str = "config.json";

    /// Shipped defaults, looked up next to the config file when not given
    pub const DEFAULTS_FILENAME: &str = "config.defaults.json";

    /// Suffix appended to the config file name while an atomic write is in flight
    pub const TEMP_SUFFIX: &str = ".tmp";
}

/// Settings window
pub mod window {
    /// Window title is this prefix followed by the plugin name
    pub const TITLE_PREFIX: &str = "Config for ";

    /// Plugin name when none is given on the command line
    pub const DEFAULT_PLUGIN_NAME: &str = "plugin";
}

/// Layout building
pub mod layout {
    /// Tab that collects top-level scalar keys when the layout is inferred
    pub const GENERAL_TAB: &str = "General";

    /// Bounds for inferred number inputs, which have no declared range
    pub const NUMBER_INPUT_MIN: f64 = -1_000_000_000.0;
    pub const NUMBER_INPUT_MAX: f64 = 1_000_000_000.0;

    /// Gap between a control and its description label, in pixels
    pub const LABEL_SPACING: f32 = 7.0;
}
