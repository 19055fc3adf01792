use std::path::PathBuf;

use anyhow::{anyhow, Result};
use eframe::egui::{self, Key, Modifiers};

use crate::config::ViewerConfig;
use crate::data::model::RawSegment;
use crate::session::Viewer;
use crate::state::{NavAction, ViewerState};
use crate::ui::{panels, plot};

const WINDOW_TITLE: &str = "FIF Viewer – Annotated Segment";

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SegmentViewerApp {
    pub state: ViewerState,
}

impl SegmentViewerApp {
    pub fn new(config: ViewerConfig, segment: RawSegment, path: Option<PathBuf>) -> Self {
        let mut state = ViewerState::new(config);
        state.set_segment(segment, path);
        Self { state }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let mut close = false;
        let actions: Vec<NavAction> = ctx.input(|i| {
            close = i.key_pressed(Key::Escape);
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => key_action(*key, *modifiers),
                    _ => None,
                })
                .collect()
        });
        for action in actions {
            self.state.apply(action);
        }
        if close {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

/// Keyboard shortcut table.
fn key_action(key: Key, modifiers: Modifiers) -> Option<NavAction> {
    let step = if modifiers.shift { 1.0 } else { 0.25 };
    let action = match key {
        Key::ArrowLeft => NavAction::ScrollTime(-step),
        Key::ArrowRight => NavAction::ScrollTime(step),
        Key::ArrowUp | Key::PageUp => NavAction::PageChannels(-1),
        Key::ArrowDown | Key::PageDown => NavAction::PageChannels(1),
        Key::Plus | Key::Equals => NavAction::LargerTraces,
        Key::Minus => NavAction::SmallerTraces,
        Key::Home => NavAction::HalveDuration,
        Key::End => NavAction::DoubleDuration,
        Key::N => NavAction::NextAnnotation,
        Key::P => NavAction::PreviousAnnotation,
        Key::A => NavAction::ToggleAnnotations,
        Key::D => NavAction::ToggleDc,
        _ => return None,
    };
    Some(action)
}

impl eframe::App for SegmentViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        // ---- Top panel: menu bar and navigation ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters and annotation list ----
        egui::SidePanel::left("side_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: traces ----
        let interaction = egui::CentralPanel::default()
            .show(ctx, |ui| plot::trace_plot(ui, &self.state))
            .inner;

        if interaction.dragged_by != 0.0 {
            self.state.pan(-interaction.dragged_by);
        }
        if let Some(t) = interaction.clicked_at {
            match self.state.annotation_at(t) {
                Some(idx) => self.state.select_annotation(idx),
                None => self.state.selected_annotation = None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Native window
// ---------------------------------------------------------------------------

/// Shows a segment in a native window and blocks until it is closed.
pub struct EguiViewer {
    pub config: ViewerConfig,
    pub source_path: Option<PathBuf>,
}

impl Viewer for EguiViewer {
    fn show(self, segment: RawSegment) -> Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(self.config.window_size)
                .with_min_inner_size([600.0, 400.0]),
            ..Default::default()
        };

        log::info!(
            "Showing {} channels, {:.1} s, {} annotations",
            segment.n_channels(),
            segment.duration(),
            segment.annotations.len()
        );
        let app = SegmentViewerApp::new(self.config, segment, self.source_path);
        eframe::run_native(
            WINDOW_TITLE,
            options,
            Box::new(move |_cc| Ok(Box::new(app))),
        )
        .map_err(|e| anyhow!("viewer window failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        let none = Modifiers::NONE;
        assert_eq!(
            key_action(Key::ArrowRight, none),
            Some(NavAction::ScrollTime(0.25))
        );
        assert_eq!(
            key_action(Key::ArrowLeft, Modifiers::SHIFT),
            Some(NavAction::ScrollTime(-1.0))
        );
        assert_eq!(
            key_action(Key::PageDown, none),
            Some(NavAction::PageChannels(1))
        );
        assert_eq!(key_action(Key::Equals, none), Some(NavAction::LargerTraces));
        assert_eq!(key_action(Key::N, none), Some(NavAction::NextAnnotation));
        assert_eq!(key_action(Key::Q, none), None);
    }

    #[test]
    fn test_toolbar_mirrors_shortcuts() {
        let buttons: Vec<NavAction> = [
            panels::TIME_BUTTONS,
            panels::DURATION_BUTTONS,
            panels::CHANNEL_BUTTONS,
            panels::AMPLITUDE_BUTTONS,
        ]
        .iter()
        .flat_map(|group| group.iter().map(|&(_, _, action)| action))
        .collect();

        let keys = [
            Key::ArrowLeft,
            Key::ArrowRight,
            Key::ArrowUp,
            Key::ArrowDown,
            Key::PageUp,
            Key::PageDown,
            Key::Plus,
            Key::Minus,
            Key::Home,
            Key::End,
            Key::N,
            Key::P,
        ];
        for modifiers in [Modifiers::NONE, Modifiers::SHIFT] {
            for key in keys {
                let action = key_action(key, modifiers).unwrap();
                assert!(buttons.contains(&action), "no button for {key:?}");
            }
        }
    }
}
