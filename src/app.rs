/// Main application GUI for rsync-gui
use crate::config::{OutputMode, Settings};
use crate::picker::FolderPicker;
use crate::transfer::TransferLauncher;
use crate::types::{Notification, NotificationKind, TransferEvent};
use eframe::egui;
use egui::*;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Lines kept in the output pane
const MAX_OUTPUT_LINES: usize = 500;

/// Dark theme color palette
struct Colors;

impl Colors {
    const BACKGROUND: Color32 = Color32::from_rgb(15, 20, 30);
    const SURFACE: Color32 = Color32::from_rgb(25, 32, 45);
    const SURFACE_ELEVATED: Color32 = Color32::from_rgb(35, 42, 55);
    const BORDER: Color32 = Color32::from_rgb(55, 62, 75);
    const TEXT_PRIMARY: Color32 = Color32::from_rgb(248, 250, 252);
    const TEXT_SECONDARY: Color32 = Color32::from_rgb(160, 170, 185);
    const TEXT_MUTED: Color32 = Color32::from_rgb(115, 125, 140);
    const ACCENT: Color32 = Color32::from_rgb(59, 130, 246);
    const ACCENT_LIGHT: Color32 = Color32::from_rgb(96, 165, 250);
    const ACCENT_SURFACE: Color32 = Color32::from_rgb(23, 37, 84);
    const SUCCESS: Color32 = Color32::from_rgb(34, 197, 94);
    const SUCCESS_LIGHT: Color32 = Color32::from_rgb(74, 222, 128);
    const SUCCESS_SURFACE: Color32 = Color32::from_rgb(20, 83, 45);
    const ERROR: Color32 = Color32::from_rgb(239, 68, 68);
    const HEADER: Color32 = Color32::from_rgb(35, 45, 65);
}

struct ButtonStyle;

impl ButtonStyle {
    fn primary() -> (Color32, Color32) {
        (Colors::ACCENT, Colors::TEXT_PRIMARY)
    }

    fn error() -> (Color32, Color32) {
        (Colors::ERROR, Colors::TEXT_PRIMARY)
    }

    fn secondary() -> (Color32, Color32) {
        (Colors::SURFACE_ELEVATED, Colors::TEXT_PRIMARY)
    }
}

/// Label text for a selected directory
fn path_label(prefix: &str, path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("{}: {}", prefix, path.display()),
        None => format!("{}: Not selected", prefix),
    }
}

fn push_bounded(lines: &mut VecDeque<String>, line: String) {
    if lines.len() >= MAX_OUTPUT_LINES {
        lines.pop_front();
    }
    lines.push_back(line);
}

/// What the window shows about the current transfer
struct TransferView {
    /// Transfer whose output the pane is showing
    current: Option<Uuid>,
    status_message: String,
    output: VecDeque<String>,
}

impl TransferView {
    fn new() -> Self {
        Self {
            current: None,
            status_message: "Idle".to_string(),
            output: VecDeque::new(),
        }
    }

    fn begin(&mut self, id: Uuid) {
        self.current = Some(id);
        self.status_message = "Starting...".to_string();
    }

    /// Fold one event into the view; `Finished` yields its dialog
    fn apply(&mut self, event: TransferEvent) -> Option<Notification> {
        match event {
            TransferEvent::Started { id, command } => {
                self.current = Some(id);
                self.status_message = "Transferring...".to_string();
                self.output.clear();
                push_bounded(&mut self.output, format!("$ {}", command));
                None
            }
            // Late lines from an earlier transfer's helpers are dropped
            TransferEvent::Output { id, line } => {
                if self.current == Some(id) {
                    push_bounded(&mut self.output, line);
                }
                None
            }
            TransferEvent::Finished { id, result } => {
                if self.current == Some(id) {
                    self.status_message = "Idle".to_string();
                }
                Some(match result {
                    Ok(()) => Notification::success("Rsync completed successfully"),
                    Err(e) => Notification::error(&e),
                })
            }
        }
    }
}

/// Main application state
pub struct RsyncApp {
    launcher: TransferLauncher,
    events_rx: mpsc::UnboundedReceiver<TransferEvent>,
    view: TransferView,
    notifications: VecDeque<Notification>,
    show_output: bool,
}

impl RsyncApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> io::Result<Self> {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.visuals = Visuals::dark();
        style.visuals.window_fill = Colors::BACKGROUND;
        style.visuals.panel_fill = Colors::BACKGROUND;
        style.visuals.extreme_bg_color = Colors::SURFACE;
        style.visuals.window_rounding = Rounding::same(12.0);
        style.spacing.button_padding = Vec2::new(16.0, 8.0);
        style.spacing.item_spacing = Vec2::new(8.0, 8.0);
        cc.egui_ctx.set_style(style);

        let show_output = settings.output == OutputMode::Capture;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let launcher = TransferLauncher::new(settings, events_tx)?;

        Ok(Self {
            launcher,
            events_rx,
            view: TransferView::new(),
            notifications: VecDeque::new(),
            show_output,
        })
    }

    /// Drain lifecycle events from the transfer task
    fn process_transfer_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(note) = self.view.apply(event) {
                self.notifications.push_back(note);
            }
        }
    }

    fn pick_source(&mut self) {
        let current = self.launcher.selection().source;
        if let Some(path) = FolderPicker::pick("Select Source Directory", current.as_deref()) {
            self.launcher.select_source(path);
        }
    }

    fn pick_dest(&mut self) {
        let current = self.launcher.selection().dest;
        if let Some(path) = FolderPicker::pick("Select Destination Directory", current.as_deref()) {
            self.launcher.select_dest(path);
        }
    }

    fn start_transfer(&mut self) {
        match self.launcher.start_selected() {
            Ok(id) => self.view.begin(id),
            Err(e) => self.notifications.push_back(Notification::error(&e)),
        }
    }

    fn stop_transfer(&mut self) {
        match self.launcher.stop() {
            Ok(()) => {
                self.view.status_message = "Stopping...".to_string();
                self.notifications.push_back(Notification::info(
                    "Stopped",
                    "Rsync process has been stopped",
                ));
            }
            Err(e) => self.notifications.push_back(Notification::error(&e)),
        }
    }

    /// Modal for the oldest pending notification
    fn show_notification(&mut self, ctx: &Context) {
        let Some(note) = self.notifications.front().cloned() else {
            return;
        };

        let accent = match note.kind {
            NotificationKind::Success => Colors::SUCCESS,
            NotificationKind::Info => Colors::ACCENT,
            NotificationKind::Error => Colors::ERROR,
        };

        let mut dismissed = false;
        Window::new(note.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .frame(Frame::window(&ctx.style())
                .fill(Colors::SURFACE_ELEVATED)
                .stroke(Stroke::new(2.0, accent))
                .rounding(12.0))
            .show(ctx, |ui| {
                ui.add_space(12.0);
                ui.colored_label(Colors::TEXT_PRIMARY, RichText::new(&note.message).size(14.0));
                ui.add_space(16.0);

                let (bg, text) = ButtonStyle::secondary();
                if ui.add_sized([100.0, 36.0],
                                Button::new(RichText::new("OK").color(text).size(13.0))
                                    .fill(bg)
                                    .rounding(8.0)
                ).on_hover_cursor(CursorIcon::PointingHand).clicked() {
                    dismissed = true;
                }
                ui.add_space(8.0);
            });

        if dismissed {
            self.notifications.pop_front();
        }
    }

    fn draw_header(&mut self, ui: &mut Ui) {
        let header_rect = Rect::from_min_size(ui.min_rect().min, Vec2::new(ui.available_width(), 64.0));
        ui.painter().rect_filled(header_rect, 0.0, Colors::HEADER);

        ui.add_space(18.0);
        ui.horizontal(|ui| {
            ui.add_space(20.0);
            ui.colored_label(Colors::TEXT_PRIMARY, RichText::new("Rsync GUI").size(22.0).strong());

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.add_space(20.0);

                let (status_color, status_bg) = if self.launcher.is_active() {
                    (Colors::ACCENT_LIGHT, Colors::ACCENT_SURFACE)
                } else {
                    (Colors::SUCCESS_LIGHT, Colors::SUCCESS_SURFACE)
                };

                Frame::none()
                    .fill(status_bg)
                    .rounding(20.0)
                    .inner_margin(Margin::symmetric(14.0, 6.0))
                    .stroke(Stroke::new(1.5, status_color))
                    .show(ui, |ui| {
                        ui.colored_label(status_color, RichText::new(&self.view.status_message).size(13.0).strong());
                    });
            });
        });
        ui.add_space(18.0);
    }

    /// Path label plus its picker button; returns true when clicked
    fn draw_path_card(ui: &mut Ui, label: &str, button_text: &str) -> bool {
        let mut clicked = false;
        Frame::none()
            .fill(Colors::SURFACE)
            .rounding(12.0)
            .inner_margin(14.0)
            .outer_margin(Margin::symmetric(20.0, 0.0))
            .stroke(Stroke::new(1.0, Colors::BORDER))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(Colors::TEXT_SECONDARY, RichText::new(label).size(13.0).monospace());

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let (bg, text) = ButtonStyle::secondary();
                        clicked = ui.add(Button::new(RichText::new(button_text).color(text).size(13.0))
                                .fill(bg)
                                .rounding(8.0)
                        ).on_hover_cursor(CursorIcon::PointingHand).clicked();
                    });
                });
            });
        clicked
    }

    fn draw_controls(&mut self, ui: &mut Ui) {
        let selection = self.launcher.selection();

        if Self::draw_path_card(ui, &path_label("Source Path", selection.source.as_deref()), "Select Source Directory") {
            self.pick_source();
        }
        ui.add_space(8.0);
        if Self::draw_path_card(ui, &path_label("Dest Path", selection.dest.as_deref()), "Select Destination Directory") {
            self.pick_dest();
        }
        ui.add_space(16.0);

        ui.horizontal(|ui| {
            ui.add_space(20.0);

            let (bg, text) = ButtonStyle::primary();
            if ui.add_sized([140.0, 40.0],
                            Button::new(RichText::new("Start Rsync").color(text).size(14.0).strong())
                                .fill(bg)
                                .rounding(10.0)
            ).on_hover_cursor(CursorIcon::PointingHand).clicked() {
                self.start_transfer();
            }

            ui.add_space(12.0);

            let (bg, text) = ButtonStyle::error();
            if ui.add_sized([140.0, 40.0],
                            Button::new(RichText::new("Stop Rsync").color(text).size(14.0).strong())
                                .fill(bg)
                                .rounding(10.0)
            ).on_hover_cursor(CursorIcon::PointingHand).clicked() {
                self.stop_transfer();
            }
        });
    }

    fn draw_output(&mut self, ui: &mut Ui) {
        ui.add_space(16.0);
        Frame::none()
            .fill(Colors::SURFACE)
            .rounding(12.0)
            .inner_margin(12.0)
            .outer_margin(Margin::symmetric(20.0, 0.0))
            .stroke(Stroke::new(1.0, Colors::BORDER))
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .max_height(ui.available_height() - 20.0)
                    .auto_shrink([false; 2])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if self.view.output.is_empty() {
                            ui.colored_label(Colors::TEXT_MUTED, RichText::new("No output yet").size(12.0));
                        }
                        for line in &self.view.output {
                            ui.colored_label(Colors::TEXT_SECONDARY, RichText::new(line).size(12.0).monospace());
                        }
                    });
            });
    }
}

impl eframe::App for RsyncApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.process_transfer_events();
        self.show_notification(ctx);

        CentralPanel::default()
            .frame(Frame::central_panel(&ctx.style())
                .fill(Colors::BACKGROUND)
                .inner_margin(0.0))
            .show(ctx, |ui| {
                self.draw_header(ui);
                self.draw_controls(ui);
                if self.show_output {
                    self.draw_output(ui);
                }
            });

        // Keep polling the event channel while nothing else triggers a repaint
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferError;

    #[test]
    fn labels_show_selection_state() {
        assert_eq!(path_label("Source Path", None), "Source Path: Not selected");
        assert_eq!(
            path_label("Dest Path", Some(Path::new("/tmp/b"))),
            "Dest Path: /tmp/b"
        );
    }

    #[test]
    fn output_pane_is_bounded() {
        let mut lines = VecDeque::new();
        for i in 0..MAX_OUTPUT_LINES + 5 {
            push_bounded(&mut lines, format!("line {}", i));
        }
        assert_eq!(lines.len(), MAX_OUTPUT_LINES);
        assert_eq!(lines.front().map(String::as_str), Some("line 5"));
    }

    #[test]
    fn output_from_other_transfers_is_ignored() {
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        let mut view = TransferView::new();
        view.begin(new);

        let started = TransferEvent::Started { id: new, command: "rsync -avh /a/ /b".to_string() };
        assert_eq!(view.apply(started), None);
        view.apply(TransferEvent::Output { id: old, line: "stale".to_string() });
        view.apply(TransferEvent::Output { id: new, line: "sending incremental file list".to_string() });

        assert_eq!(
            view.output.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["$ rsync -avh /a/ /b", "sending incremental file list"]
        );
        assert_eq!(view.status_message, "Transferring...");
    }

    #[test]
    fn finished_always_notifies_but_only_current_resets_status() {
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        let mut view = TransferView::new();
        view.begin(new);

        let late = view.apply(TransferEvent::Finished { id: old, result: Ok(()) });
        assert_eq!(late.map(|n| n.kind), Some(NotificationKind::Success));
        assert_eq!(view.status_message, "Starting...");

        let failed = view.apply(TransferEvent::Finished {
            id: new,
            result: Err(TransferError::ProcessFailure { code: Some(23), status: "exit status: 23".to_string() }),
        });
        assert_eq!(failed.map(|n| n.kind), Some(NotificationKind::Error));
        assert_eq!(view.status_message, "Idle");
    }
}
