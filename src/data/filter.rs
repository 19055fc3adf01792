use std::collections::{BTreeMap, BTreeSet};

use super::model::RawSegment;

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per facet
// ---------------------------------------------------------------------------

/// Facet holding annotation descriptions.
pub const DESCRIPTION_FACET: &str = "description";
/// Facet holding channel types (`eeg`, `eog`, ...).
pub const CHANNEL_TYPE_FACET: &str = "channel type";

/// Per-facet selection state: maps facet name → set of selected values.
/// If a facet is absent it means "no filter" (show all); an empty set hides
/// everything in that facet.
pub type FilterState = BTreeMap<String, BTreeSet<String>>;

/// All values each facet can take for a segment.
pub fn facet_values(segment: &RawSegment) -> BTreeMap<String, BTreeSet<String>> {
    let mut facets = BTreeMap::new();
    facets.insert(
        CHANNEL_TYPE_FACET.to_string(),
        segment.channel_kinds().iter().map(|k| k.to_string()).collect(),
    );
    facets.insert(
        DESCRIPTION_FACET.to_string(),
        segment.annotations.descriptions.clone(),
    );
    facets
}

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(segment: &RawSegment) -> FilterState {
    facet_values(segment)
}

fn passes(filters: &FilterState, facet: &str, value: &str) -> bool {
    match filters.get(facet) {
        None => true,
        Some(selected) => selected.contains(value),
    }
}

/// Return indices of channels whose type is selected.
pub fn visible_channels(segment: &RawSegment, filters: &FilterState) -> Vec<usize> {
    segment
        .info
        .channels
        .iter()
        .enumerate()
        .filter(|(_, ch)| passes(filters, CHANNEL_TYPE_FACET, &ch.kind.to_string()))
        .map(|(i, _)| i)
        .collect()
}

/// Return indices of annotations whose description is selected.
pub fn visible_annotations(segment: &RawSegment, filters: &FilterState) -> Vec<usize> {
    segment
        .annotations
        .iter()
        .enumerate()
        .filter(|(_, a)| passes(filters, DESCRIPTION_FACET, &a.description))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{
        Annotation, Annotations, ChannelInfo, ChannelKind, MeasInfo,
    };

    fn segment() -> RawSegment {
        let ch = |name: &str, kind| ChannelInfo {
            name: name.into(),
            kind,
            cal: 1.0,
            unit: 107,
            bad: false,
        };
        let ann = |onset, description: &str| Annotation {
            onset,
            duration: 0.2,
            description: description.into(),
        };
        RawSegment {
            info: MeasInfo {
                channels: vec![
                    ch("Fz", ChannelKind::Eeg),
                    ch("EOG-V", ChannelKind::Eog),
                    ch("Cz", ChannelKind::Eeg),
                ],
                sfreq: 100.0,
                meas_date: None,
                highpass: None,
                lowpass: None,
                line_freq: None,
                bads: vec![],
            },
            first_samp: 0,
            data: vec![vec![0.0; 10]; 3],
            annotations: Annotations::new(vec![
                ann(1.0, "blink"),
                ann(2.0, "BAD_segment"),
                ann(3.0, "blink"),
            ]),
        }
    }

    #[test]
    fn test_everything_visible_initially() {
        let seg = segment();
        let filters = init_filter_state(&seg);
        assert_eq!(visible_channels(&seg, &filters), vec![0, 1, 2]);
        assert_eq!(visible_annotations(&seg, &filters), vec![0, 1, 2]);
        assert_eq!(filters[CHANNEL_TYPE_FACET].len(), 2);
    }

    #[test]
    fn test_deselecting_hides() {
        let seg = segment();
        let mut filters = init_filter_state(&seg);
        filters.get_mut(CHANNEL_TYPE_FACET).unwrap().remove("eog");
        filters.get_mut(DESCRIPTION_FACET).unwrap().remove("blink");
        assert_eq!(visible_channels(&seg, &filters), vec![0, 2]);
        assert_eq!(visible_annotations(&seg, &filters), vec![1]);
    }

    #[test]
    fn test_empty_set_hides_all_and_absent_facet_shows_all() {
        let seg = segment();
        let mut filters = FilterState::new();
        filters.insert(DESCRIPTION_FACET.to_string(), BTreeSet::new());
        assert!(visible_annotations(&seg, &filters).is_empty());
        assert_eq!(visible_channels(&seg, &filters).len(), 3);
    }
}
