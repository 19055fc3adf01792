use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// ChannelKind – what a channel measures
// ---------------------------------------------------------------------------

/// Channel type as coded in the file's channel-info records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelKind {
    Eeg,
    Eog,
    Ecg,
    Emg,
    Meg,
    Stim,
    Resp,
    Misc,
    Other(i32),
}

impl ChannelKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ChannelKind::Meg,
            2 => ChannelKind::Eeg,
            3 => ChannelKind::Stim,
            202 => ChannelKind::Eog,
            302 => ChannelKind::Emg,
            402 => ChannelKind::Ecg,
            502 => ChannelKind::Misc,
            602 => ChannelKind::Resp,
            other => ChannelKind::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ChannelKind::Meg => 1,
            ChannelKind::Eeg => 2,
            ChannelKind::Stim => 3,
            ChannelKind::Eog => 202,
            ChannelKind::Emg => 302,
            ChannelKind::Ecg => 402,
            ChannelKind::Misc => 502,
            ChannelKind::Resp => 602,
            ChannelKind::Other(code) => code,
        }
    }

    /// Amplitude (in the channel's unit) that spans half a trace row.
    pub fn default_scaling(self) -> f64 {
        match self {
            ChannelKind::Eeg => 20e-6,
            ChannelKind::Eog => 150e-6,
            ChannelKind::Ecg => 5e-4,
            ChannelKind::Emg => 1e-3,
            ChannelKind::Meg => 1e-12,
            ChannelKind::Stim | ChannelKind::Resp | ChannelKind::Misc | ChannelKind::Other(_) => {
                1.0
            }
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Eeg => write!(f, "eeg"),
            ChannelKind::Eog => write!(f, "eog"),
            ChannelKind::Ecg => write!(f, "ecg"),
            ChannelKind::Emg => write!(f, "emg"),
            ChannelKind::Meg => write!(f, "meg"),
            ChannelKind::Stim => write!(f, "stim"),
            ChannelKind::Resp => write!(f, "resp"),
            ChannelKind::Misc => write!(f, "misc"),
            ChannelKind::Other(code) => write!(f, "kind {code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    pub kind: ChannelKind,
    /// Factor from stored values to physical units (`range * cal`).
    pub cal: f64,
    /// Unit code as stored (107 = volts).
    pub unit: i32,
    pub bad: bool,
}

/// Measurement start, seconds + microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasDate {
    pub secs: i64,
    pub usecs: i64,
}

impl MeasDate {
    pub fn as_seconds(&self) -> f64 {
        self.secs as f64 + self.usecs as f64 * 1e-6
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, (self.usecs * 1_000) as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasInfo {
    pub channels: Vec<ChannelInfo>,
    /// Sampling frequency in Hz.
    pub sfreq: f64,
    pub meas_date: Option<MeasDate>,
    pub highpass: Option<f64>,
    pub lowpass: Option<f64>,
    pub line_freq: Option<f64>,
    pub bads: Vec<String>,
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// A labelled interval (or instant, when `duration == 0`).
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Seconds from the first sample of the segment.
    pub onset: f64,
    pub duration: f64,
    pub description: String,
}

impl Annotation {
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }

    pub fn is_instant(&self) -> bool {
        self.duration <= 0.0
    }

    /// Whether `t` falls inside the annotation, widened by `tolerance` on
    /// both sides so instants can be hit.
    pub fn contains(&self, t: f64, tolerance: f64) -> bool {
        t >= self.onset - tolerance && t <= self.end() + tolerance
    }

    /// Whether the annotation overlaps `[t0, t1]`.
    pub fn overlaps(&self, t0: f64, t1: f64) -> bool {
        self.onset <= t1 && self.end() >= t0
    }
}

/// All annotations of a segment, kept sorted by onset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    items: Vec<Annotation>,
    /// Sorted set of unique descriptions.
    pub descriptions: BTreeSet<String>,
}

impl Annotations {
    pub fn new(mut items: Vec<Annotation>) -> Self {
        items.sort_by(|a, b| a.onset.total_cmp(&b.onset));
        let descriptions = items.iter().map(|a| a.description.clone()).collect();
        Self {
            items,
            descriptions,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Annotation> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    pub fn count_of(&self, description: &str) -> usize {
        self.items
            .iter()
            .filter(|a| a.description == description)
            .count()
    }
}

// ---------------------------------------------------------------------------
// RawSegment – the complete loaded recording excerpt
// ---------------------------------------------------------------------------

/// A preloaded segment: calibrated samples plus metadata and annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub info: MeasInfo,
    /// Index of the first sample relative to the measurement start.
    pub first_samp: i64,
    /// Channel-major samples in physical units; every row has `n_times` values.
    pub data: Vec<Vec<f64>>,
    pub annotations: Annotations,
}

impl RawSegment {
    pub fn n_channels(&self) -> usize {
        self.data.len()
    }

    pub fn n_times(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn sfreq(&self) -> f64 {
        self.info.sfreq
    }

    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.n_times() as f64 / self.info.sfreq
    }

    /// Time of the first sample on the measurement clock.
    pub fn first_time(&self) -> f64 {
        self.first_samp as f64 / self.info.sfreq
    }

    /// Nearest sample index for a segment-relative time, clamped to the data.
    pub fn sample_at(&self, t: f64) -> usize {
        let idx = (t * self.info.sfreq).round();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.n_times())
        }
    }

    pub fn channel_kinds(&self) -> BTreeSet<ChannelKind> {
        self.info.channels.iter().map(|c| c.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_codes() {
        for kind in [
            ChannelKind::Eeg,
            ChannelKind::Eog,
            ChannelKind::Ecg,
            ChannelKind::Emg,
            ChannelKind::Meg,
            ChannelKind::Stim,
            ChannelKind::Resp,
            ChannelKind::Misc,
            ChannelKind::Other(910),
        ] {
            assert_eq!(ChannelKind::from_code(kind.code()), kind);
        }
        assert_eq!(ChannelKind::Eog.to_string(), "eog");
    }

    #[test]
    fn test_annotations_sorted_by_onset() {
        let ann = Annotations::new(vec![
            Annotation {
                onset: 12.0,
                duration: 0.3,
                description: "blink".into(),
            },
            Annotation {
                onset: 2.0,
                duration: 0.0,
                description: "saccade".into(),
            },
            Annotation {
                onset: 5.0,
                duration: 0.4,
                description: "blink".into(),
            },
        ]);
        let onsets: Vec<f64> = ann.iter().map(|a| a.onset).collect();
        assert_eq!(onsets, vec![2.0, 5.0, 12.0]);
        assert_eq!(ann.descriptions.len(), 2);
        assert_eq!(ann.count_of("blink"), 2);
        assert!(ann.get(0).unwrap().is_instant());
    }

    #[test]
    fn test_annotation_hit_testing() {
        let a = Annotation {
            onset: 10.0,
            duration: 2.0,
            description: "blink".into(),
        };
        assert!(a.contains(11.0, 0.0));
        assert!(!a.contains(12.5, 0.0));
        assert!(a.contains(12.5, 0.6));
        assert!(a.overlaps(11.5, 20.0));
        assert!(!a.overlaps(0.0, 9.9));
    }

    #[test]
    fn test_meas_date() {
        let d = MeasDate {
            secs: 1_495_169_973,
            usecs: 500_000,
        };
        assert!((d.as_seconds() - 1_495_169_973.5).abs() < 1e-6);
        let dt = d.to_datetime().unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2017-05-19");
    }
}
