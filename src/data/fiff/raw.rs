use std::io::ErrorKind;
use std::path::Path;

use super::tag::{read_tags, ChInfoRecord};
use super::tree::Node;
use super::{block, kind, FifError, FifResult};
use crate::data::model::{
    Annotation, Annotations, ChannelInfo, ChannelKind, MeasDate, MeasInfo, RawSegment,
};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a whole raw segment file into memory.
pub fn read_raw(path: &Path) -> FifResult<RawSegment> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FifError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    read_raw_bytes(&bytes)
}

/// Parse a raw segment from an in-memory FIF image.
pub fn read_raw_bytes(bytes: &[u8]) -> FifResult<RawSegment> {
    let tags = read_tags(bytes)?;
    let tree = Node::build(&tags)?;

    let meas = tree
        .find_block(block::MEAS)
        .ok_or_else(|| FifError::Malformed("no measurement block".to_string()))?;
    let info_node = meas
        .find_block(block::MEAS_INFO)
        .ok_or_else(|| FifError::Malformed("no measurement info block".to_string()))?;
    let info = read_meas_info(info_node)?;

    let raw_node = meas
        .find_block(block::RAW_DATA)
        .or_else(|| meas.find_block(block::CONTINUOUS_DATA))
        .ok_or_else(|| FifError::Malformed("no raw data block".to_string()))?;
    let (first_samp, data) = read_raw_data(raw_node, &info)?;

    let annotations = match tree.find_block(block::MNE_ANNOTATIONS) {
        Some(node) => read_annotations(node, &info, first_samp)?,
        None => Annotations::default(),
    };

    Ok(RawSegment {
        info,
        first_samp,
        data,
        annotations,
    })
}

// ---------------------------------------------------------------------------
// Measurement info
// ---------------------------------------------------------------------------

impl From<ChInfoRecord> for ChannelInfo {
    fn from(rec: ChInfoRecord) -> Self {
        ChannelInfo {
            name: rec.name,
            kind: ChannelKind::from_code(rec.kind),
            cal: rec.range as f64 * rec.cal as f64,
            unit: rec.unit,
            bad: false,
        }
    }
}

fn read_meas_info(node: &Node<'_>) -> FifResult<MeasInfo> {
    let nchan = node
        .tag(kind::NCHAN)
        .ok_or_else(|| FifError::Malformed("channel count missing".to_string()))?
        .as_i32()?;
    if nchan <= 0 {
        return Err(FifError::Malformed(format!("invalid channel count {nchan}")));
    }

    let sfreq = node
        .tag(kind::SFREQ)
        .ok_or_else(|| FifError::Malformed("sampling frequency missing".to_string()))?
        .to_f64()?;
    if !(sfreq > 0.0 && sfreq.is_finite()) {
        return Err(FifError::Malformed(format!(
            "invalid sampling frequency {sfreq}"
        )));
    }

    let mut channels = node
        .tags_of(kind::CH_INFO)
        .map(|t| t.as_ch_info().map(ChannelInfo::from))
        .collect::<FifResult<Vec<_>>>()?;
    if channels.len() != nchan as usize {
        return Err(FifError::Malformed(format!(
            "{nchan} channels declared but {} channel records found",
            channels.len()
        )));
    }

    let meas_date = match node.tag(kind::MEAS_DATE) {
        Some(tag) => match tag.as_i32s()?.as_slice() {
            [secs, usecs, ..] => Some(MeasDate {
                secs: *secs as i64,
                usecs: *usecs as i64,
            }),
            [secs] => Some(MeasDate {
                secs: *secs as i64,
                usecs: 0,
            }),
            [] => None,
        },
        None => None,
    };

    let optional_f64 = |k: i32| node.tag(k).map(|t| t.to_f64()).transpose();

    let bads = match node
        .find_block(block::MNE_BAD_CHANNELS)
        .and_then(|b| b.tag(kind::MNE_CH_NAME_LIST))
    {
        Some(tag) => split_name_list(&tag.as_str()?),
        None => Vec::new(),
    };
    for name in &bads {
        match channels.iter_mut().find(|c| &c.name == name) {
            Some(ch) => ch.bad = true,
            None => log::warn!("bad channel {name} is not in the channel list"),
        }
    }

    Ok(MeasInfo {
        channels,
        sfreq,
        meas_date,
        highpass: optional_f64(kind::HIGHPASS)?,
        lowpass: optional_f64(kind::LOWPASS)?,
        line_freq: optional_f64(kind::LINE_FREQ)?,
        bads,
    })
}

/// Split a `:`-separated name list; an empty string is an empty list.
pub(crate) fn split_name_list(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(':').map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

fn read_raw_data(node: &Node<'_>, info: &MeasInfo) -> FifResult<(i64, Vec<Vec<f64>>)> {
    let nchan = info.channels.len();
    let mut first_samp = match node.tag(kind::FIRST_SAMPLE) {
        Some(tag) => tag.as_i32()? as i64,
        None => 0,
    };
    let cals: Vec<f64> = info.channels.iter().map(|c| c.cal).collect();

    let mut data: Vec<Vec<f64>> = vec![Vec::new(); nchan];
    let mut pending_skip: usize = 0;

    for tag in &node.tags {
        match tag.kind {
            kind::DATA_BUFFER => {
                let values = tag.to_f64s()?;
                if values.len() % nchan != 0 {
                    return Err(FifError::Malformed(format!(
                        "data buffer at {} holds {} values, not a multiple of {nchan} channels",
                        tag.pos,
                        values.len()
                    )));
                }
                let nsamp = values.len() / nchan;
                if pending_skip > 0 {
                    let skipped = pending_skip * nsamp;
                    if data.first().map_or(true, Vec::is_empty) {
                        // A leading skip moves the segment start instead of padding it
                        first_samp += skipped as i64;
                    } else {
                        pad_zeros(&mut data, skipped);
                    }
                    pending_skip = 0;
                }
                for row in data.iter_mut() {
                    row.reserve(nsamp);
                }
                for frame in values.chunks_exact(nchan) {
                    for ((row, &value), &cal) in data.iter_mut().zip(frame).zip(&cals) {
                        row.push(value * cal);
                    }
                }
            }
            kind::DATA_SKIP => pending_skip += non_negative(tag.as_i32()?, tag.pos)?,
            kind::DATA_SKIP_SAMP => pad_zeros(&mut data, non_negative(tag.as_i32()?, tag.pos)?),
            kind::FIRST_SAMPLE | kind::NOP => {}
            other => log::warn!("skipping unexpected tag {other} at {} in raw data", tag.pos),
        }
    }

    if pending_skip > 0 {
        log::warn!("ignoring trailing skip of {pending_skip} buffer(s)");
    }
    if data.first().map_or(true, Vec::is_empty) {
        return Err(FifError::Malformed(
            "raw data block contains no samples".to_string(),
        ));
    }
    Ok((first_samp, data))
}

fn non_negative(value: i32, pos: usize) -> FifResult<usize> {
    usize::try_from(value)
        .map_err(|_| FifError::Malformed(format!("negative skip {value} at {pos}")))
}

fn pad_zeros(data: &mut [Vec<f64>], n: usize) {
    for row in data {
        row.resize(row.len() + n, 0.0);
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

fn read_annotations(node: &Node<'_>, info: &MeasInfo, first_samp: i64) -> FifResult<Annotations> {
    let onsets = match node.tag(kind::MNE_BASELINE_MIN) {
        Some(tag) => tag.to_f64s()?,
        None => Vec::new(),
    };
    let ends = match node.tag(kind::MNE_BASELINE_MAX) {
        Some(tag) => tag.to_f64s()?,
        None => Vec::new(),
    };
    // An empty comment is one empty description unless there are no onsets
    let descriptions: Vec<String> = match node.tag(kind::COMMENT) {
        Some(tag) if !onsets.is_empty() => {
            tag.as_str()?.split(':').map(str::to_string).collect()
        }
        Some(tag) => split_name_list(&tag.as_str()?),
        None => Vec::new(),
    };
    if onsets.len() != ends.len() || onsets.len() != descriptions.len() {
        return Err(FifError::Malformed(format!(
            "annotation arrays differ in length: {} onsets, {} ends, {} descriptions",
            onsets.len(),
            ends.len(),
            descriptions.len()
        )));
    }

    let orig_time = match node.tag(kind::MEAS_DATE) {
        Some(tag) => match tag.to_f64s()?.as_slice() {
            [secs, usecs, ..] => Some(secs + usecs * 1e-6),
            [secs] => Some(*secs),
            [] => None,
        },
        None => None,
    };
    let shift = onset_shift(orig_time, info.meas_date, first_samp, info.sfreq);

    let items = onsets
        .into_iter()
        .zip(ends)
        .zip(descriptions)
        .map(|((onset, end), description)| Annotation {
            onset: onset + shift,
            duration: (end - onset).max(0.0),
            description,
        })
        .collect();
    Ok(Annotations::new(items))
}

/// Offset that moves stored onsets onto the segment's own time axis.
///
/// With an orig time the onsets are on the measurement clock, so the first
/// sample's time (and any difference between the two clocks) is removed.
/// Without one they are already relative to the first sample.
pub(crate) fn onset_shift(
    orig_time: Option<f64>,
    meas_date: Option<MeasDate>,
    first_samp: i64,
    sfreq: f64,
) -> f64 {
    let Some(orig) = orig_time else {
        return 0.0;
    };
    let first_time = first_samp as f64 / sfreq;
    match meas_date {
        Some(date) => orig - date.as_seconds() - first_time,
        None => -first_time,
    }
}
