//! Structured, persisted plugin configuration and a settings window whose
//! controls stay in sync with it.
//!
//! - [`config`]: dotted-key access over a current document with read-only
//!   defaults, change listeners and persistence
//! - [`binding`]: one control kept in sync with one config key
//! - [`layout`]: tabs, groups and controls, built lazily per window opening
//! - [`window`]: open / commit / discard lifecycle
//! - [`session`]: ties the above together for one plugin
//! - [`toolkit`]: what a UI toolkit must provide; [`gui`] is the egui one

#![forbid(unsafe_code)]

pub mod binding;
pub mod color;
pub mod config;
pub mod constants;
pub mod gui;
pub mod layout;
pub mod session;
pub mod toolkit;
pub mod window;

pub use binding::{Binding, Coercion, EditOutcome, Validator};
pub use config::{ConfigError, ConfigPath, ConfigStore, Result};
pub use layout::{ContainerNode, ControlHandle, LayoutRegistry};
pub use session::PluginSession;
pub use window::{WindowController, WindowState};
