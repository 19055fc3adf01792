use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::color::ColorMap;
use crate::config::ViewerConfig;
use crate::data::filter::{
    facet_values, init_filter_state, visible_annotations, visible_channels, FilterState,
};
use crate::data::model::RawSegment;

/// Smallest and largest window the navigation allows, in seconds.
const MIN_DURATION: f64 = 0.1;
const MAX_DURATION: f64 = 3600.0;

/// Amplitude zoom step for `+` / `-`.
const SCALE_STEP: f64 = 1.25;

// ---------------------------------------------------------------------------
// Navigation actions (keyboard shortcuts and toolbar)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavAction {
    /// Scroll by a fraction of the window.
    ScrollTime(f64),
    PageChannels(i64),
    LargerTraces,
    SmallerTraces,
    HalveDuration,
    DoubleDuration,
    NextAnnotation,
    PreviousAnnotation,
    ToggleAnnotations,
    ToggleDc,
}

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct ViewerState {
    /// Loaded segment (None only if the user's reload failed before any load).
    pub segment: Option<RawSegment>,
    pub source_path: Option<PathBuf>,
    pub config: ViewerConfig,

    /// Left edge of the visible window, seconds from the first sample.
    pub t_start: f64,
    /// Visible window length in seconds.
    pub duration: f64,
    /// First row of the current channel page (index into `visible_channels`).
    pub ch_start: usize,
    /// Rows per page.
    pub n_channels: usize,
    /// Multiplies every per-kind scaling; larger shows smaller traces.
    pub scale_factor: f64,
    pub remove_dc: bool,
    pub show_annotations: bool,

    /// Per-facet filter selections.
    pub filters: FilterState,
    /// Channel indices passing the type filter (cached).
    pub visible_channels: Vec<usize>,
    /// Annotation indices passing the description filter (cached).
    pub visible_annotations: Vec<usize>,

    pub color_map: Option<ColorMap>,
    pub selected_annotation: Option<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            segment: None,
            source_path: None,
            t_start: 0.0,
            duration: config.duration,
            ch_start: 0,
            n_channels: config.n_channels,
            scale_factor: 1.0,
            remove_dc: config.remove_dc,
            show_annotations: config.show_annotations,
            filters: FilterState::default(),
            visible_channels: Vec::new(),
            visible_annotations: Vec::new(),
            color_map: None,
            selected_annotation: None,
            status_message: None,
            config,
        }
    }

    /// Ingest a newly loaded segment, initialise filters, colours and view.
    pub fn set_segment(&mut self, segment: RawSegment, path: Option<PathBuf>) {
        self.filters = init_filter_state(&segment);
        self.color_map = Some(ColorMap::new(&segment.annotations.descriptions));
        self.t_start = 0.0;
        self.ch_start = 0;
        self.selected_annotation = None;
        self.segment = Some(segment);
        self.source_path = path;
        self.status_message = None;
        self.refilter();
        self.clamp_view();
    }

    /// Recompute cached visible indices after a filter change.
    pub fn refilter(&mut self) {
        if let Some(seg) = &self.segment {
            self.visible_channels = visible_channels(seg, &self.filters);
            self.visible_annotations = visible_annotations(seg, &self.filters);
        }
        if let Some(sel) = self.selected_annotation {
            if !self.visible_annotations.contains(&sel) {
                self.selected_annotation = None;
            }
        }
        self.clamp_view();
    }

    fn segment_duration(&self) -> f64 {
        self.segment.as_ref().map_or(0.0, RawSegment::duration)
    }

    /// Keep the window and channel page inside the data.
    pub fn clamp_view(&mut self) {
        let total = self.segment_duration();
        self.duration = self.duration.clamp(MIN_DURATION, MAX_DURATION);
        let max_start = (total - self.duration).max(0.0);
        self.t_start = self.t_start.clamp(0.0, max_start);

        self.n_channels = self.n_channels.max(1);
        let rows = self.visible_channels.len();
        let max_ch_start = rows.saturating_sub(self.n_channels);
        self.ch_start = self.ch_start.min(max_ch_start);
    }

    pub fn apply(&mut self, action: NavAction) {
        match action {
            NavAction::ScrollTime(fraction) => self.scroll_time(fraction),
            NavAction::PageChannels(pages) => self.page_channels(pages),
            NavAction::LargerTraces => self.zoom_in_amplitude(),
            NavAction::SmallerTraces => self.zoom_out_amplitude(),
            NavAction::HalveDuration => self.set_duration(self.duration / 2.0),
            NavAction::DoubleDuration => self.set_duration(self.duration * 2.0),
            NavAction::NextAnnotation => self.step_annotation(true),
            NavAction::PreviousAnnotation => self.step_annotation(false),
            NavAction::ToggleAnnotations => self.show_annotations = !self.show_annotations,
            NavAction::ToggleDc => self.remove_dc = !self.remove_dc,
        }
    }

    // ---- time navigation ----

    /// Scroll by a fraction of the window (negative goes back).
    pub fn scroll_time(&mut self, fraction: f64) {
        self.t_start += fraction * self.duration;
        self.clamp_view();
    }

    /// Pan by an absolute number of seconds.
    pub fn pan(&mut self, seconds: f64) {
        self.t_start += seconds;
        self.clamp_view();
    }

    /// Centre the window on `t`.
    pub fn center_on(&mut self, t: f64) {
        self.t_start = t - self.duration / 2.0;
        self.clamp_view();
    }

    /// Change the window length, keeping its centre.
    pub fn set_duration(&mut self, duration: f64) {
        let centre = self.t_start + self.duration / 2.0;
        self.duration = duration;
        self.clamp_view();
        self.center_on(centre);
    }

    pub fn time_window(&self) -> (f64, f64) {
        (self.t_start, self.t_start + self.duration)
    }

    // ---- channel navigation ----

    /// Move by whole pages (negative goes up).
    pub fn page_channels(&mut self, pages: i64) {
        let step = self.n_channels as i64 * pages;
        let next = (self.ch_start as i64 + step).max(0);
        self.ch_start = next as usize;
        self.clamp_view();
    }

    /// Channel indices on the current page.
    pub fn channels_on_page(&self) -> &[usize] {
        let start = self.ch_start.min(self.visible_channels.len());
        let end = (start + self.n_channels).min(self.visible_channels.len());
        &self.visible_channels[start..end]
    }

    // ---- amplitude ----

    pub fn zoom_in_amplitude(&mut self) {
        self.scale_factor /= SCALE_STEP;
    }

    pub fn zoom_out_amplitude(&mut self) {
        self.scale_factor *= SCALE_STEP;
    }

    /// Amplitude spanning half a row for channel `idx`.
    pub fn scaling_for_channel(&self, idx: usize) -> f64 {
        let kind = self
            .segment
            .as_ref()
            .and_then(|s| s.info.channels.get(idx))
            .map(|c| c.kind);
        match kind {
            Some(kind) => self.config.scaling_for(kind) * self.scale_factor,
            None => self.scale_factor,
        }
    }

    // ---- annotations ----

    /// Visible annotation under time `t`, none while annotations are hidden.
    /// Instants get a tolerance of 1% of the window so they can be clicked.
    pub fn annotation_at(&self, t: f64) -> Option<usize> {
        if !self.show_annotations {
            return None;
        }
        let seg = self.segment.as_ref()?;
        let tolerance = self.duration * 0.01;
        self.visible_annotations.iter().copied().find(|&i| {
            seg.annotations.get(i).is_some_and(|a| {
                let tol = if a.is_instant() { tolerance } else { 0.0 };
                a.contains(t, tol)
            })
        })
    }

    /// Select an annotation and bring it into view.
    pub fn select_annotation(&mut self, idx: usize) {
        let onset_mid = self
            .segment
            .as_ref()
            .and_then(|s| s.annotations.get(idx))
            .map(|a| a.onset + a.duration / 2.0);
        if let Some(t) = onset_mid {
            self.selected_annotation = Some(idx);
            let (t0, t1) = self.time_window();
            if t < t0 || t > t1 {
                self.center_on(t);
            }
        }
    }

    /// Select an annotation and centre the window on it.
    pub fn jump_to_annotation(&mut self, idx: usize) {
        let mid = self
            .segment
            .as_ref()
            .and_then(|s| s.annotations.get(idx))
            .map(|a| a.onset + a.duration / 2.0);
        if let Some(t) = mid {
            self.selected_annotation = Some(idx);
            self.center_on(t);
        }
    }

    /// Step to the next (or previous) visible annotation after the current
    /// selection, or after the window start when nothing is selected.
    pub fn step_annotation(&mut self, forward: bool) {
        let Some(seg) = &self.segment else {
            return;
        };
        let pos = self
            .selected_annotation
            .and_then(|sel| self.visible_annotations.iter().position(|&i| i == sel));
        let target = match (pos, forward) {
            (Some(p), true) => self.visible_annotations.get(p + 1).copied(),
            (Some(p), false) => p.checked_sub(1).and_then(|p| self.visible_annotations.get(p).copied()),
            (None, true) => self
                .visible_annotations
                .iter()
                .copied()
                .find(|&i| seg.annotations.get(i).is_some_and(|a| a.onset >= self.t_start)),
            (None, false) => self
                .visible_annotations
                .iter()
                .rev()
                .copied()
                .find(|&i| seg.annotations.get(i).is_some_and(|a| a.onset < self.t_start)),
        };
        if let Some(idx) = target {
            self.jump_to_annotation(idx);
        }
    }

    // ---- filters ----

    /// Toggle a single value in a facet's filter.
    pub fn toggle_filter_value(&mut self, facet: &str, value: &str) {
        let selected = self.filters.entry(facet.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Select all values in a facet.
    pub fn select_all(&mut self, facet: &str) {
        if let Some(seg) = &self.segment {
            if let Some(all) = facet_values(seg).remove(facet) {
                self.filters.insert(facet.to_string(), all);
                self.refilter();
            }
        }
    }

    /// Deselect all values in a facet.
    pub fn select_none(&mut self, facet: &str) {
        self.filters.insert(facet.to_string(), BTreeSet::new());
        self.refilter();
    }

    pub fn is_selected(&self, facet: &str, value: &str) -> bool {
        self.filters
            .get(facet)
            .map_or(true, |selected| selected.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{CHANNEL_TYPE_FACET, DESCRIPTION_FACET};
    use crate::data::model::{
        Annotation, Annotations, ChannelInfo, ChannelKind, MeasInfo,
    };

    /// 60 s at 100 Hz, 25 EEG + 2 EOG channels, three annotations.
    fn segment() -> RawSegment {
        let mut channels: Vec<ChannelInfo> = (0..25)
            .map(|i| ChannelInfo {
                name: format!("E{}", i + 1),
                kind: ChannelKind::Eeg,
                cal: 1.0,
                unit: 107,
                bad: false,
            })
            .collect();
        for name in ["EOG-V", "EOG-H"] {
            channels.push(ChannelInfo {
                name: name.into(),
                kind: ChannelKind::Eog,
                cal: 1.0,
                unit: 107,
                bad: false,
            });
        }
        let n = channels.len();
        RawSegment {
            info: MeasInfo {
                channels,
                sfreq: 100.0,
                meas_date: None,
                highpass: None,
                lowpass: None,
                line_freq: None,
                bads: vec![],
            },
            first_samp: 0,
            data: vec![vec![0.0; 6000]; n],
            annotations: Annotations::new(vec![
                Annotation {
                    onset: 11.0,
                    duration: 0.3,
                    description: "blink".into(),
                },
                Annotation {
                    onset: 30.0,
                    duration: 0.0,
                    description: "marker".into(),
                },
                Annotation {
                    onset: 55.0,
                    duration: 0.4,
                    description: "blink".into(),
                },
            ]),
        }
    }

    fn state() -> ViewerState {
        let mut st = ViewerState::new(ViewerConfig::default());
        st.set_segment(segment(), None);
        st
    }

    #[test]
    fn test_initial_view() {
        let st = state();
        assert_eq!(st.time_window(), (0.0, 10.0));
        assert_eq!(st.channels_on_page().len(), 20);
        assert_eq!(st.visible_annotations, vec![0, 1, 2]);
    }

    #[test]
    fn test_time_scrolling_is_clamped() {
        let mut st = state();
        st.scroll_time(0.25);
        assert_eq!(st.t_start, 2.5);
        st.scroll_time(-1.0);
        assert_eq!(st.t_start, 0.0);
        st.pan(1000.0);
        assert_eq!(st.t_start, 50.0);
    }

    #[test]
    fn test_duration_keeps_centre() {
        let mut st = state();
        st.center_on(30.0);
        assert_eq!(st.t_start, 25.0);
        st.set_duration(20.0);
        assert_eq!(st.time_window(), (20.0, 40.0));
        st.set_duration(1000.0);
        assert_eq!(st.time_window(), (0.0, 1000.0));
        st.set_duration(0.0);
        assert!((st.duration - MIN_DURATION).abs() < 1e-12);
    }

    #[test]
    fn test_channel_paging() {
        let mut st = state();
        st.page_channels(1);
        // 27 rows, 20 per page: the last page starts at row 7
        assert_eq!(st.ch_start, 7);
        assert_eq!(st.channels_on_page().len(), 20);
        assert_eq!(*st.channels_on_page().last().unwrap(), 26);
        st.page_channels(-5);
        assert_eq!(st.ch_start, 0);
    }

    #[test]
    fn test_type_filter_shrinks_pages() {
        let mut st = state();
        st.page_channels(1);
        st.toggle_filter_value(CHANNEL_TYPE_FACET, "eeg");
        assert_eq!(st.visible_channels, vec![25, 26]);
        assert_eq!(st.ch_start, 0);
        assert_eq!(st.channels_on_page(), &[25, 26]);
        assert!(!st.is_selected(CHANNEL_TYPE_FACET, "eeg"));
        st.select_all(CHANNEL_TYPE_FACET);
        assert_eq!(st.visible_channels.len(), 27);
    }

    #[test]
    fn test_scaling() {
        let mut st = state();
        assert_eq!(st.scaling_for_channel(0), 20e-6);
        assert_eq!(st.scaling_for_channel(26), 150e-6);
        st.zoom_out_amplitude();
        assert!((st.scaling_for_channel(0) - 25e-6).abs() < 1e-15);
        st.zoom_in_amplitude();
        assert!((st.scaling_for_channel(0) - 20e-6).abs() < 1e-15);
    }

    #[test]
    fn test_annotation_hit_and_selection() {
        let mut st = state();
        assert_eq!(st.annotation_at(11.1), Some(0));
        assert_eq!(st.annotation_at(12.0), None);
        // instant at 30 s, tolerance is 1% of the 10 s window
        assert_eq!(st.annotation_at(30.05), Some(1));

        st.select_annotation(2);
        assert_eq!(st.selected_annotation, Some(2));
        assert_eq!(st.time_window(), (50.0, 60.0));

        st.apply(NavAction::ToggleAnnotations);
        assert_eq!(st.annotation_at(11.1), None);
        st.apply(NavAction::ToggleAnnotations);

        st.select_none(DESCRIPTION_FACET);
        assert!(st.visible_annotations.is_empty());
        assert_eq!(st.selected_annotation, None);
        assert_eq!(st.annotation_at(11.1), None);
    }

    #[test]
    fn test_actions() {
        let mut st = state();
        st.apply(NavAction::ScrollTime(1.0));
        assert_eq!(st.t_start, 10.0);
        st.apply(NavAction::DoubleDuration);
        assert_eq!(st.time_window(), (5.0, 25.0));
        st.apply(NavAction::HalveDuration);
        assert_eq!(st.time_window(), (10.0, 20.0));
        st.apply(NavAction::PageChannels(1));
        assert_eq!(st.ch_start, 7);
        st.apply(NavAction::ToggleDc);
        assert!(!st.remove_dc);
        st.apply(NavAction::ToggleAnnotations);
        assert!(!st.show_annotations);
        st.apply(NavAction::LargerTraces);
        assert!(st.scale_factor < 1.0);
    }

    #[test]
    fn test_step_annotation() {
        let mut st = state();
        st.step_annotation(true);
        assert_eq!(st.selected_annotation, Some(0));
        st.step_annotation(true);
        assert_eq!(st.selected_annotation, Some(1));
        assert_eq!(st.t_start, 25.0);
        st.step_annotation(false);
        assert_eq!(st.selected_annotation, Some(0));
        st.step_annotation(false);
        assert_eq!(st.selected_annotation, Some(0));
    }
}
