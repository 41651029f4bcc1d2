//! eframe settings window: tabs, footer and the Save / Cancel / Restore
//! Defaults / Advanced buttons

use anyhow::{Context, Result, anyhow};
use eframe::{NativeOptions, egui};
use tracing::{error, info, warn};

use super::constants::*;
use super::render;
use super::toolkit::EguiToolkit;
use crate::config::ConfigError;
use crate::session::PluginSession;

struct StatusMessage {
    text: String,
    color: egui::Color32,
}

impl StatusMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: STATUS_INFO,
        }
    }

    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: STATUS_OK,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: STATUS_ERROR,
        }
    }
}

/// Button presses collected while drawing, applied once the frame is laid out
enum Action {
    Save,
    Cancel,
    RestoreDefaults,
    ToggleAdvanced,
    ApplyAdvanced,
}

struct SettingsApp {
    session: PluginSession<EguiToolkit>,
    selected_tab: usize,
    status_message: Option<StatusMessage>,
    /// Raw JSON buffer while the advanced editor is shown
    advanced: Option<String>,
}

impl SettingsApp {
    fn new(session: PluginSession<EguiToolkit>) -> Self {
        info!(plugin = %session.name(), "Initializing settings window");
        Self {
            session,
            selected_tab: 0,
            status_message: None,
            advanced: None,
        }
    }

    /// Start in the advanced editor because the stored config cannot be
    /// shown by the controls
    fn repairing(session: PluginSession<EguiToolkit>, err: &ConfigError) -> Self {
        let mut app = Self::new(session);
        match app.session.store().to_json_pretty() {
            Ok(json) => app.advanced = Some(json),
            Err(e) => error!(error = %e, "Failed to serialize config for the advanced editor"),
        }
        app.status_message = Some(StatusMessage::error(format!(
            "{}. Fix the config below and press Apply.",
            err.user_message()
        )));
        app
    }

    fn apply(&mut self, action: Action, ctx: &egui::Context) {
        if !self.session.window().is_open() {
            self.apply_while_closed(action, ctx);
            return;
        }
        match action {
            Action::Save => match self.session.commit() {
                Ok(()) => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
                Err(e) => self.status_message = Some(StatusMessage::error(e.user_message())),
            },
            Action::Cancel => match self.session.discard() {
                Ok(()) => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
                Err(e) => self.status_message = Some(StatusMessage::error(e.user_message())),
            },
            Action::RestoreDefaults => {
                self.status_message = Some(match self.session.window_mut().restore_defaults() {
                    Ok(()) => StatusMessage::info("Press Save to keep the restored defaults"),
                    Err(e) => StatusMessage::error(e.user_message()),
                });
            }
            Action::ToggleAdvanced => {
                self.advanced = match self.advanced.take() {
                    Some(_) => None,
                    None => match self.session.store().to_json_pretty() {
                        Ok(json) => Some(json),
                        Err(e) => {
                            self.status_message = Some(StatusMessage::error(e.user_message()));
                            None
                        }
                    },
                };
            }
            Action::ApplyAdvanced => {
                let Some(json) = self.advanced.as_deref() else {
                    return;
                };
                match self.session.window_mut().apply_raw(json) {
                    Ok(()) => {
                        self.advanced = None;
                        self.status_message = Some(StatusMessage::ok("Applied raw config"));
                    }
                    Err(e) => {
                        warn!(error = %e, "Rejected raw config");
                        self.status_message = Some(StatusMessage::error(e.user_message()));
                    }
                }
            }
        }
    }

    /// Only reachable while repairing a config the window could not show
    fn apply_while_closed(&mut self, action: Action, ctx: &egui::Context) {
        let reopened = match action {
            Action::Cancel => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
            Action::ApplyAdvanced => {
                let Some(json) = self.advanced.as_deref() else {
                    return;
                };
                self.session.open_with_raw(json)
            }
            Action::RestoreDefaults => self
                .session
                .store()
                .restore_defaults()
                .and_then(|()| self.session.open_window()),
            Action::Save | Action::ToggleAdvanced => {
                self.status_message =
                    Some(StatusMessage::info("Apply a config the settings window can show first"));
                return;
            }
        };
        match reopened {
            Ok(()) => {
                info!("Settings window opened after repair");
                self.advanced = None;
                self.status_message = Some(StatusMessage::ok("Config repaired, press Save to keep it"));
            }
            Err(e) => {
                warn!(error = %e, "Config still cannot be shown");
                self.status_message = Some(StatusMessage::error(e.user_message()));
            }
        }
    }

    fn buttons(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            let advanced_label = if self.advanced.is_some() {
                "Hide Advanced"
            } else {
                "Advanced"
            };
            if ui.button(advanced_label).clicked() {
                actions.push(Action::ToggleAdvanced);
            }
            if ui.button("Restore Defaults").clicked() {
                actions.push(Action::RestoreDefaults);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Save").clicked() {
                    actions.push(Action::Save);
                }
                if ui.button("Cancel").clicked() {
                    actions.push(Action::Cancel);
                }
            });
        });
    }
}

impl eframe::App for SettingsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();

        // Closing from the title bar abandons edits, like Cancel
        if ctx.input(|i| i.viewport().close_requested())
            && self.session.window().is_open()
            && let Err(e) = self.session.discard()
        {
            error!(error = %e, "Failed to discard settings on close");
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.status_message = Some(StatusMessage::error(e.user_message()));
        }

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter)) {
            actions.push(Action::Save);
        }

        egui::TopBottomPanel::bottom("settings_buttons").show(ctx, |ui| {
            ui.add_space(ITEM_SPACING);
            if let Some(message) = &self.status_message {
                ui.colored_label(message.color, &message.text);
                ui.add_space(ITEM_SPACING);
            }
            self.buttons(ui, &mut actions);
            ui.add_space(ITEM_SPACING);
        });

        let root = self.session.window().root().cloned();
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(json) = &mut self.advanced {
                ui.label(egui::RichText::new("Advanced").strong());
                ui.add_space(ITEM_SPACING);
                egui::ScrollArea::vertical()
                    .max_height((ui.available_height() - SECTION_SPACING * 3.0).max(0.0))
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(json)
                                .code_editor()
                                .desired_rows(ADVANCED_EDITOR_ROWS)
                                .desired_width(f32::INFINITY),
                        );
                    });
                ui.add_space(ITEM_SPACING);
                if ui.button("Apply").clicked() {
                    actions.push(Action::ApplyAdvanced);
                }
            } else if let Some(root) = &root {
                render::window_body(ui, root, &mut self.selected_tab);
            }
        });

        for action in actions {
            self.apply(action, ctx);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.session.window().is_open()
            && let Err(e) = self.session.discard()
        {
            error!(error = %e, "Failed to discard settings during shutdown");
        }
        info!("Settings window exiting");
    }
}

/// Open the session's settings window and run it until it closes
pub fn run_settings_window(mut session: PluginSession<EguiToolkit>) -> Result<()> {
    let repair = match session.open_window() {
        Ok(()) => None,
        Err(e) if matches!(e.root_cause(), ConfigError::BindingType { .. }) => {
            warn!(error = %e, "Stored config does not fit the settings window, opening advanced editor");
            Some(e)
        }
        Err(e) => {
            return Err(anyhow!(e.user_message())).context("Failed to build settings window");
        }
    };

    let title = session.window().title().to_string();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title(title.clone()),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Ok(Box::new(match &repair {
                Some(err) => SettingsApp::repairing(session, err),
                None => SettingsApp::new(session),
            }))
        }),
    )
    .map_err(|err| anyhow!("Failed to launch settings window: {err}"))
}
