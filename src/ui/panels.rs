use eframe::egui::{self, Color32, RichText, ScrollArea, Sense, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::channel_color;
use crate::data::export::export_annotations;
use crate::data::filter::{facet_values, CHANNEL_TYPE_FACET, DESCRIPTION_FACET};
use crate::data::loader::{load_file, SUPPORTED_EXTENSIONS};
use crate::data::model::ChannelKind;
use crate::state::{NavAction, ViewerState};

// ---------------------------------------------------------------------------
// Left side panel – filters and annotation list
// ---------------------------------------------------------------------------

/// Render the left side panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    let segment = match &state.segment {
        Some(seg) => seg,
        None => {
            ui.label("No segment loaded.");
            return;
        }
    };

    // Clone what we need so we can mutate state after drawing.
    let n_types = facet_values(segment)
        .get(CHANNEL_TYPE_FACET)
        .map_or(0, |v| v.len());
    let kinds: Vec<(ChannelKind, usize)> = segment
        .channel_kinds()
        .into_iter()
        .map(|k| (k, segment.info.channels.iter().filter(|c| c.kind == k).count()))
        .collect();
    let counts: Vec<(String, usize)> = segment
        .annotations
        .descriptions
        .iter()
        .map(|d| (d.clone(), segment.annotations.count_of(d)))
        .collect();

    let mut toggles: Vec<(&str, String)> = Vec::new();
    let mut select_all: Option<&str> = None;
    let mut select_none: Option<&str> = None;

    ScrollArea::vertical()
        .id_salt("side_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Annotation descriptions ----
            ui.heading("Annotations");
            ui.separator();
            if counts.is_empty() {
                ui.label("No annotations in this segment.");
            }
            facet_buttons(ui, DESCRIPTION_FACET, &mut select_all, &mut select_none);
            for (description, count) in &counts {
                let color = state
                    .color_map
                    .as_ref()
                    .map_or(Color32::GRAY, |cm| cm.color_for(description));
                let mut checked = state.is_selected(DESCRIPTION_FACET, description);
                let text = RichText::new(format!("{description}  ({count})")).color(color);
                if ui.checkbox(&mut checked, text).changed() {
                    toggles.push((DESCRIPTION_FACET, description.clone()));
                }
            }

            ui.add_space(8.0);

            // ---- Channel types ----
            egui::CollapsingHeader::new(
                RichText::new(format!("Channel types ({n_types})")).strong(),
            )
            .id_salt("channel_types")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                facet_buttons(ui, CHANNEL_TYPE_FACET, &mut select_all, &mut select_none);
                for (kind, n) in &kinds {
                    let label = kind.to_string();
                    let mut checked = state.is_selected(CHANNEL_TYPE_FACET, &label);
                    let text = RichText::new(format!("{label}  ({n})"))
                        .color(channel_color(*kind, false));
                    if ui.checkbox(&mut checked, text).changed() {
                        toggles.push((CHANNEL_TYPE_FACET, label));
                    }
                }
            });

            ui.add_space(8.0);
            annotation_table(ui, state);
            ui.add_space(8.0);
            selected_details(ui, state);
        });

    for (facet, value) in toggles {
        state.toggle_filter_value(facet, &value);
    }
    if let Some(facet) = select_all {
        state.select_all(facet);
    }
    if let Some(facet) = select_none {
        state.select_none(facet);
    }
}

fn facet_buttons<'f>(
    ui: &mut Ui,
    facet: &'f str,
    select_all: &mut Option<&'f str>,
    select_none: &mut Option<&'f str>,
) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            *select_all = Some(facet);
        }
        if ui.small_button("None").clicked() {
            *select_none = Some(facet);
        }
    });
}

/// Table of visible annotations; clicking a row jumps to it.
fn annotation_table(ui: &mut Ui, state: &mut ViewerState) {
    let Some(segment) = &state.segment else {
        return;
    };
    let visible = state.visible_annotations.clone();
    let selected = state.selected_annotation;
    let mut clicked: Option<usize> = None;

    egui::CollapsingHeader::new(
        RichText::new(format!("Annotation list ({})", visible.len())).strong(),
    )
    .id_salt("annotation_list")
    .default_open(true)
    .show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .id_salt("annotation_table")
            .striped(true)
            .sense(Sense::click())
            .max_scroll_height(240.0)
            .column(Column::auto().at_least(60.0))
            .column(Column::auto().at_least(50.0))
            .column(Column::remainder())
            .header(18.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Onset (s)");
                });
                header.col(|ui| {
                    ui.strong("Dur. (s)");
                });
                header.col(|ui| {
                    ui.strong("Description");
                });
            })
            .body(|body| {
                body.rows(18.0, visible.len(), |mut row| {
                    let idx = visible[row.index()];
                    let Some(a) = segment.annotations.get(idx) else {
                        return;
                    };
                    row.set_selected(selected == Some(idx));
                    row.col(|ui| {
                        ui.label(format!("{:.2}", a.onset));
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.2}", a.duration));
                    });
                    row.col(|ui| {
                        ui.label(a.description.as_str());
                    });
                    if row.response().clicked() {
                        clicked = Some(idx);
                    }
                });
            });
    });

    if let Some(idx) = clicked {
        state.jump_to_annotation(idx);
    }
}

fn selected_details(ui: &mut Ui, state: &ViewerState) {
    let Some(a) = state
        .selected_annotation
        .and_then(|i| state.segment.as_ref()?.annotations.get(i))
    else {
        return;
    };
    ui.strong("Selected annotation");
    egui::Grid::new("selected_annotation")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("Description");
            ui.label(a.description.as_str());
            ui.end_row();
            ui.label("Onset");
            ui.label(format!("{:.3} s", a.onset));
            ui.end_row();
            ui.label("Duration");
            ui.label(format!("{:.3} s", a.duration));
            ui.end_row();
            ui.label("End");
            ui.label(format!("{:.3} s", a.end()));
            ui.end_row();
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state
                .segment
                .as_ref()
                .is_some_and(|s| !s.annotations.is_empty());
            if ui
                .add_enabled(can_export, egui::Button::new("Export annotations…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        if let Some(seg) = &state.segment {
            let n_eeg = seg
                .info
                .channels
                .iter()
                .filter(|c| c.kind == ChannelKind::Eeg)
                .count();
            let mut summary = format!(
                "{} channels ({} EEG), {} Hz, {:.1} s",
                seg.n_channels(),
                n_eeg,
                seg.sfreq(),
                seg.duration()
            );
            if let Some(date) = seg.info.meas_date.and_then(|d| d.to_datetime()) {
                summary.push_str(&format!(", recorded {}", date.format("%Y-%m-%d %H:%M:%S UTC")));
            }
            ui.label(summary);
        }

        ui.separator();
        navigation(ui, state);

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Toolbar buttons as (label, hover text, action); each mirrors a shortcut.
pub const TIME_BUTTONS: &[(&str, &str, NavAction)] = &[
    ("⏮", "Previous annotation (P)", NavAction::PreviousAnnotation),
    ("⏪", "Back one window (Shift+←)", NavAction::ScrollTime(-1.0)),
    ("◀", "Back (←)", NavAction::ScrollTime(-0.25)),
    ("▶", "Forward (→)", NavAction::ScrollTime(0.25)),
    ("⏩", "Forward one window (Shift+→)", NavAction::ScrollTime(1.0)),
    ("⏭", "Next annotation (N)", NavAction::NextAnnotation),
];

pub const DURATION_BUTTONS: &[(&str, &str, NavAction)] = &[
    ("½", "Halve duration (Home)", NavAction::HalveDuration),
    ("×2", "Double duration (End)", NavAction::DoubleDuration),
];

pub const CHANNEL_BUTTONS: &[(&str, &str, NavAction)] = &[
    ("▲", "Previous channels (↑ / PgUp)", NavAction::PageChannels(-1)),
    ("▼", "Next channels (↓ / PgDn)", NavAction::PageChannels(1)),
];

pub const AMPLITUDE_BUTTONS: &[(&str, &str, NavAction)] = &[
    ("−", "Smaller traces (-)", NavAction::SmallerTraces),
    ("+", "Larger traces (+)", NavAction::LargerTraces),
];

fn action_buttons(ui: &mut Ui, state: &mut ViewerState, buttons: &[(&str, &str, NavAction)]) {
    for &(label, hover, action) in buttons {
        if ui.small_button(label).on_hover_text(hover).clicked() {
            state.apply(action);
        }
    }
}

fn navigation(ui: &mut Ui, state: &mut ViewerState) {
    action_buttons(ui, state, TIME_BUTTONS);

    let (t0, t1) = state.time_window();
    ui.label(format!("{t0:.1}–{t1:.1} s"));

    let mut duration = state.duration;
    let max = state
        .segment
        .as_ref()
        .map_or(60.0, |s| s.duration().max(1.0));
    if ui
        .add(
            egui::DragValue::new(&mut duration)
                .range(0.1..=max)
                .speed(0.1)
                .suffix(" s"),
        )
        .changed()
    {
        state.set_duration(duration);
    }
    action_buttons(ui, state, DURATION_BUTTONS);

    ui.separator();
    let mut n_channels = state.n_channels;
    if ui
        .add(
            egui::DragValue::new(&mut n_channels)
                .range(1..=256)
                .suffix(" ch"),
        )
        .changed()
    {
        state.n_channels = n_channels;
        state.clamp_view();
    }
    action_buttons(ui, state, CHANNEL_BUTTONS);

    ui.separator();
    action_buttons(ui, state, AMPLITUDE_BUTTONS);

    ui.separator();
    if ui
        .selectable_label(state.remove_dc, "Remove DC")
        .on_hover_text("D")
        .clicked()
    {
        state.apply(NavAction::ToggleDc);
    }
    if ui
        .selectable_label(state.show_annotations, "Annotations")
        .on_hover_text("A")
        .clicked()
    {
        state.apply(NavAction::ToggleAnnotations);
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Open recording segment")
        .add_filter("FIF files", SUPPORTED_EXTENSIONS)
        .pick_file();

    if let Some(path) = file {
        match load_file(&path) {
            Ok(segment) => {
                state.set_segment(segment, Some(path));
            }
            Err(e) => {
                let e = anyhow::Error::new(e);
                log::error!("Failed to load {}: {e:#}", path.display());
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

pub fn export_dialog(state: &mut ViewerState) {
    let Some(segment) = &state.segment else {
        return;
    };
    let default_name = state
        .source_path
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| format!("{}_annotations.csv", s.to_string_lossy()))
        .unwrap_or_else(|| "annotations.csv".to_string());

    let file = rfd::FileDialog::new()
        .set_title("Export annotations")
        .set_file_name(default_name)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match export_annotations(&path, &segment.annotations) {
            Ok(()) => {
                state.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to export annotations: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
