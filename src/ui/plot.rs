use eframe::egui::{Align2, Color32, Stroke, Ui};
use egui_plot::{
    uniform_grid_spacer, GridMark, Line, Plot, PlotBounds, PlotPoint, PlotPoints, Polygon, Text,
    VLine,
};

use crate::color::channel_color;
use crate::data::window::{sample_range, trace_points, TraceParams};
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Stacked trace plot (central panel)
// ---------------------------------------------------------------------------

/// Pointer interaction on the plot during one frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlotInteraction {
    /// Time (s) under a click, if the plot was clicked.
    pub clicked_at: Option<f64>,
    /// Horizontal drag in seconds (positive = pointer moved right).
    pub dragged_by: f64,
}

struct Trace {
    name: String,
    color: Color32,
    points: Vec<[f64; 2]>,
}

struct Shade {
    onset: f64,
    end: f64,
    instant: bool,
    description: String,
    color: Color32,
    fill: Color32,
    selected: bool,
}

/// Render the channel traces of the current page over the current window.
pub fn trace_plot(ui: &mut Ui, state: &ViewerState) -> PlotInteraction {
    let segment = match &state.segment {
        Some(seg) => seg,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No segment loaded  (File → Open…)");
            });
            return PlotInteraction::default();
        }
    };

    let (t0, t1) = state.time_window();
    let rows = state.channels_on_page();
    let range = sample_range(segment, t0, state.duration);

    let traces: Vec<Trace> = rows
        .iter()
        .enumerate()
        .map(|(row, &ch)| {
            let info = &segment.info.channels[ch];
            let params = TraceParams {
                scale: state.scaling_for_channel(ch),
                remove_dc: state.remove_dc,
                offset: -(row as f64),
                max_points: state.config.max_points,
            };
            Trace {
                name: info.name.clone(),
                color: channel_color(info.kind, info.bad),
                points: trace_points(&segment.data[ch], segment.sfreq(), range.clone(), &params),
            }
        })
        .collect();
    let labels: Vec<String> = traces.iter().map(|t| t.name.clone()).collect();

    let shades: Vec<Shade> = if state.show_annotations {
        state
            .visible_annotations
            .iter()
            .filter_map(|&i| segment.annotations.get(i).map(|a| (i, a)))
            .filter(|(_, a)| a.overlaps(t0, t1))
            .map(|(i, a)| {
                let (color, fill) = match &state.color_map {
                    Some(cm) => (cm.color_for(&a.description), cm.fill_for(&a.description)),
                    None => (Color32::GRAY, Color32::GRAY.gamma_multiply(0.25)),
                };
                Shade {
                    onset: a.onset,
                    end: a.end(),
                    instant: a.is_instant(),
                    description: a.description.clone(),
                    color,
                    fill,
                    selected: state.selected_annotation == Some(i),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let y_max = 0.5;
    let y_min = 0.5 - rows.len().max(1) as f64;

    Plot::new("trace_plot")
        .x_axis_label("Time (s)")
        .show_grid([true, false])
        .y_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .y_axis_formatter(move |mark: GridMark, _range| row_label(mark.value, &labels))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .allow_double_click_reset(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([t0, y_min], [t1, y_max]));

            for shade in &shades {
                let width = if shade.selected { 3.0 } else { 1.0 };
                if shade.instant {
                    plot_ui.vline(VLine::new(shade.onset).color(shade.color).width(width));
                } else {
                    let x0 = shade.onset.max(t0);
                    let x1 = shade.end.min(t1);
                    let corners = vec![[x0, y_min], [x1, y_min], [x1, y_max], [x0, y_max]];
                    let stroke = if shade.selected {
                        Stroke::new(width, shade.color)
                    } else {
                        Stroke::NONE
                    };
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(corners))
                            .fill_color(shade.fill)
                            .stroke(stroke),
                    );
                }
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(shade.onset.max(t0), y_max),
                        shade.description.clone(),
                    )
                    .anchor(Align2::LEFT_TOP)
                    .color(shade.color),
                );
            }

            for trace in traces {
                plot_ui.line(
                    Line::new(PlotPoints::new(trace.points))
                        .name(trace.name)
                        .color(trace.color)
                        .width(1.0),
                );
            }

            let response = plot_ui.response();
            let clicked_at = if response.clicked() {
                plot_ui.pointer_coordinate().map(|p| p.x)
            } else {
                None
            };
            let dragged_by = if response.dragged() {
                plot_ui.pointer_coordinate_drag_delta().x as f64
            } else {
                0.0
            };
            PlotInteraction {
                clicked_at,
                dragged_by,
            }
        })
        .inner
}

/// Channel name for a y grid mark sitting on a row centre, empty otherwise.
fn row_label(value: f64, labels: &[String]) -> String {
    let row = (-value).round();
    if row < 0.0 || (value + row).abs() > 1e-6 {
        return String::new();
    }
    labels.get(row as usize).cloned().unwrap_or_default()
}
