use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::tag::{ChInfoRecord, CH_INFO_LEN, CH_NAME_MAX, ID_LEN};
use super::{block, dtype, kind, NEXT_NONE, NEXT_SEQ};
use crate::data::model::{ChannelKind, RawSegment};

/// File format version written into the file id (major 1, minor 3).
pub const FILE_VERSION: i32 = (1 << 16) | 3;

/// Coil type recorded for EEG electrodes.
const COIL_EEG: i32 = 1;

// ---------------------------------------------------------------------------
// Tag writer
// ---------------------------------------------------------------------------

/// Streams tags to `out`, tracking open blocks so they can be closed in order.
pub struct FifWriter<W: Write> {
    out: W,
    open_blocks: Vec<i32>,
}

impl<W: Write> FifWriter<W> {
    /// Start a file: writes the file id and an empty directory pointer.
    pub fn new(out: W) -> io::Result<Self> {
        let mut writer = Self {
            out,
            open_blocks: Vec::new(),
        };
        let mut id = Vec::with_capacity(ID_LEN);
        for word in [FILE_VERSION, 0, 0, 0, 0] {
            id.extend_from_slice(&word.to_be_bytes());
        }
        writer.write_raw_tag(kind::FILE_ID, dtype::ID_STRUCT, &id)?;
        writer.write_i32(kind::DIR_POINTER, -1)?;
        Ok(writer)
    }

    fn write_tag(&mut self, kind: i32, dtype: i32, payload: &[u8], next: i32) -> io::Result<()> {
        let size = i32::try_from(payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "tag payload too large"))?;
        for word in [kind, dtype, size, next] {
            self.out.write_all(&word.to_be_bytes())?;
        }
        self.out.write_all(payload)
    }

    /// Write a tag with an already-encoded payload.
    pub fn write_raw_tag(&mut self, kind: i32, dtype: i32, payload: &[u8]) -> io::Result<()> {
        self.write_tag(kind, dtype, payload, NEXT_SEQ)
    }

    pub fn start_block(&mut self, block: i32) -> io::Result<()> {
        self.write_i32(kind::BLOCK_START, block)?;
        self.open_blocks.push(block);
        Ok(())
    }

    pub fn end_block(&mut self) -> io::Result<()> {
        let block = self
            .open_blocks
            .pop()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no open block to end"))?;
        self.write_i32(kind::BLOCK_END, block)
    }

    pub fn write_i32s(&mut self, kind: i32, values: &[i32]) -> io::Result<()> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_raw_tag(kind, dtype::INT, &payload)
    }

    pub fn write_i32(&mut self, kind: i32, value: i32) -> io::Result<()> {
        self.write_i32s(kind, &[value])
    }

    pub fn write_i16s(&mut self, kind: i32, values: &[i16]) -> io::Result<()> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_raw_tag(kind, dtype::SHORT, &payload)
    }

    pub fn write_f32s(&mut self, kind: i32, values: &[f32]) -> io::Result<()> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_raw_tag(kind, dtype::FLOAT, &payload)
    }

    pub fn write_f32(&mut self, kind: i32, value: f32) -> io::Result<()> {
        self.write_f32s(kind, &[value])
    }

    pub fn write_f64s(&mut self, kind: i32, values: &[f64]) -> io::Result<()> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_raw_tag(kind, dtype::DOUBLE, &payload)
    }

    pub fn write_string(&mut self, kind: i32, value: &str) -> io::Result<()> {
        self.write_raw_tag(kind, dtype::STRING, value.as_bytes())
    }

    pub fn write_ch_info(&mut self, rec: &ChInfoRecord) -> io::Result<()> {
        let mut payload = Vec::with_capacity(CH_INFO_LEN);
        for word in [rec.scan_no, rec.log_no, rec.kind] {
            payload.extend_from_slice(&word.to_be_bytes());
        }
        payload.extend_from_slice(&rec.range.to_be_bytes());
        payload.extend_from_slice(&rec.cal.to_be_bytes());
        payload.extend_from_slice(&rec.coil_type.to_be_bytes());
        for v in &rec.loc {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        payload.extend_from_slice(&rec.unit.to_be_bytes());
        payload.extend_from_slice(&rec.unit_mul.to_be_bytes());

        let mut name = [0u8; 16];
        let bytes = rec.name.as_bytes();
        let n = bytes.len().min(CH_NAME_MAX);
        name[..n].copy_from_slice(&bytes[..n]);
        payload.extend_from_slice(&name);

        self.write_raw_tag(kind::CH_INFO, dtype::CH_INFO_STRUCT, &payload)
    }

    /// Close the tag chain and hand back the sink. All blocks must be closed.
    pub fn finish(self) -> io::Result<W> {
        if let Some(open) = self.open_blocks.last() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {open} is still open"),
            ));
        }
        self.finish_unchecked()
    }

    pub(crate) fn finish_unchecked(mut self) -> io::Result<W> {
        self.write_tag(kind::NOP, dtype::VOID, &[], NEXT_NONE)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

// ---------------------------------------------------------------------------
// Raw segment writer
// ---------------------------------------------------------------------------

/// Write a raw segment to `path`, replacing any existing file.
pub fn write_raw(path: &Path, segment: &RawSegment) -> io::Result<()> {
    let file = File::create(path)?;
    write_raw_to(BufWriter::new(file), segment)?;
    Ok(())
}

/// Encode a raw segment as float data buffers of one second each.
///
/// Annotations are stored on the measurement clock when the segment has a
/// measurement date, and relative to the first sample otherwise.
pub fn write_raw_to<W: Write>(out: W, segment: &RawSegment) -> io::Result<W> {
    let info = &segment.info;
    let nchan = i32::try_from(info.channels.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many channels"))?;
    let first_samp = i32::try_from(segment.first_samp)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "first sample out of range"))?;

    let mut w = FifWriter::new(out)?;
    w.start_block(block::MEAS)?;

    // ---- measurement info ----
    w.start_block(block::MEAS_INFO)?;
    w.write_i32(kind::NCHAN, nchan)?;
    w.write_f32(kind::SFREQ, info.sfreq as f32)?;
    if let Some(lowpass) = info.lowpass {
        w.write_f32(kind::LOWPASS, lowpass as f32)?;
    }
    if let Some(highpass) = info.highpass {
        w.write_f32(kind::HIGHPASS, highpass as f32)?;
    }
    if let Some(line_freq) = info.line_freq {
        w.write_f32(kind::LINE_FREQ, line_freq as f32)?;
    }
    if let Some(date) = info.meas_date {
        let date_field = |v: i64| {
            i32::try_from(v).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "measurement date out of range")
            })
        };
        w.write_i32s(kind::MEAS_DATE, &[date_field(date.secs)?, date_field(date.usecs)?])?;
    }
    for (i, ch) in info.channels.iter().enumerate() {
        w.write_ch_info(&ChInfoRecord {
            scan_no: i as i32 + 1,
            log_no: i as i32 + 1,
            kind: ch.kind.code(),
            range: 1.0,
            cal: ch.cal as f32,
            coil_type: if ch.kind == ChannelKind::Eeg { COIL_EEG } else { 0 },
            loc: [0.0; 12],
            unit: ch.unit,
            unit_mul: 0,
            name: ch.name.clone(),
        })?;
    }
    if !info.bads.is_empty() {
        w.start_block(block::MNE_BAD_CHANNELS)?;
        w.write_string(kind::MNE_CH_NAME_LIST, &info.bads.join(":"))?;
        w.end_block()?;
    }
    w.end_block()?;

    // ---- annotations ----
    if !segment.annotations.is_empty() {
        let offset = match info.meas_date {
            Some(_) => segment.first_time(),
            None => 0.0,
        };
        let onsets: Vec<f32> = segment
            .annotations
            .iter()
            .map(|a| (a.onset + offset) as f32)
            .collect();
        let ends: Vec<f32> = segment
            .annotations
            .iter()
            .map(|a| (a.end() + offset) as f32)
            .collect();
        let descriptions: Vec<String> = segment
            .annotations
            .iter()
            .map(|a| a.description.replace(':', ";"))
            .collect();

        w.start_block(block::MNE_ANNOTATIONS)?;
        w.write_f32s(kind::MNE_BASELINE_MIN, &onsets)?;
        w.write_f32s(kind::MNE_BASELINE_MAX, &ends)?;
        w.write_string(kind::COMMENT, &descriptions.join(":"))?;
        if let Some(date) = info.meas_date {
            w.write_f64s(kind::MEAS_DATE, &[date.secs as f64, date.usecs as f64])?;
        }
        w.end_block()?;
    }

    // ---- samples ----
    w.start_block(block::RAW_DATA)?;
    w.write_i32(kind::FIRST_SAMPLE, first_samp)?;
    let buffer_len = (info.sfreq.round() as usize).max(1);
    let n_times = segment.n_times();
    let mut start = 0;
    while start < n_times {
        let stop = (start + buffer_len).min(n_times);
        let mut frames = Vec::with_capacity((stop - start) * info.channels.len());
        for t in start..stop {
            for (row, ch) in segment.data.iter().zip(&info.channels) {
                let cal = if ch.cal != 0.0 { ch.cal } else { 1.0 };
                frames.push((row[t] / cal) as f32);
            }
        }
        w.write_f32s(kind::DATA_BUFFER, &frames)?;
        start = stop;
    }
    w.end_block()?;

    w.end_block()?;
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Annotations, ChannelInfo, MeasDate, MeasInfo};

    #[test]
    fn test_meas_date_out_of_range_is_rejected() {
        let segment = RawSegment {
            info: MeasInfo {
                channels: vec![ChannelInfo {
                    name: "Fp1".into(),
                    kind: ChannelKind::Eeg,
                    cal: 1.0,
                    unit: 107,
                    bad: false,
                }],
                sfreq: 100.0,
                meas_date: Some(MeasDate {
                    secs: i64::from(i32::MAX) + 1,
                    usecs: 0,
                }),
                highpass: None,
                lowpass: None,
                line_freq: None,
                bads: vec![],
            },
            first_samp: 0,
            data: vec![vec![0.0; 10]],
            annotations: Annotations::default(),
        };
        let err = write_raw_to(Vec::new(), &segment).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_finish_requires_closed_blocks() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(block::MEAS).unwrap();
        assert!(w.finish().is_err());
    }

    #[test]
    fn test_end_block_without_start() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        assert!(w.end_block().is_err());
    }

    #[test]
    fn test_long_channel_names_are_truncated() {
        let rec = ChInfoRecord {
            scan_no: 1,
            log_no: 1,
            kind: 2,
            range: 1.0,
            cal: 1.0,
            coil_type: COIL_EEG,
            loc: [0.0; 12],
            unit: 107,
            unit_mul: 0,
            name: "A-very-long-channel-name".to_string(),
        };
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.write_ch_info(&rec).unwrap();
        let bytes = w.finish().unwrap();
        let tags = crate::data::fiff::tag::read_tags(&bytes).unwrap();
        assert_eq!(tags[2].as_ch_info().unwrap().name, "A-very-long-cha");
    }
}
