//! egui front end for the settings window

mod app;
pub mod constants;
mod render;
pub mod toolkit;

pub use app::run_settings_window;
pub use toolkit::EguiToolkit;
