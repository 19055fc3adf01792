use super::{dtype, kind, FifError, FifResult, NEXT_NONE, NEXT_SEQ};

/// Size of the fixed tag header: kind, type, size, next (four big-endian i32).
pub const HEADER_LEN: usize = 16;

/// Size of a packed channel-info record.
pub const CH_INFO_LEN: usize = 96;

/// Size of a packed file-id record.
pub const ID_LEN: usize = 20;

/// Maximum channel name length (the record reserves 16 bytes, NUL terminated).
pub const CH_NAME_MAX: usize = 15;

// ---------------------------------------------------------------------------
// Tag – one header + payload slice borrowed from the file buffer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub kind: i32,
    pub dtype: i32,
    pub next: i32,
    /// Byte offset of the tag header in the file.
    pub pos: usize,
    pub data: &'a [u8],
}

/// Walk the tag chain of a whole file.
///
/// The first tag must be the file id, otherwise the buffer is not a FIF file.
pub fn read_tags(bytes: &[u8]) -> FifResult<Vec<Tag<'_>>> {
    if bytes.len() < HEADER_LEN {
        return Err(FifError::NotFif);
    }
    // reject foreign files before trusting any size field
    let first_kind = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if first_kind != kind::FILE_ID {
        return Err(FifError::NotFif);
    }

    let mut tags = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let tag = read_tag_at(bytes, pos)?;
        if tags.is_empty() && (tag.kind != kind::FILE_ID || tag.dtype != dtype::ID_STRUCT) {
            return Err(FifError::NotFif);
        }
        let end = pos + HEADER_LEN + tag.data.len();
        let next = tag.next;
        tags.push(tag);

        pos = match next {
            NEXT_NONE => break,
            NEXT_SEQ => end,
            n if n > 0 && n as usize >= end => n as usize,
            n => {
                return Err(FifError::Malformed(format!(
                    "tag at {pos} points to invalid next position {n}"
                )))
            }
        };
    }

    log::debug!("read {} tags", tags.len());
    Ok(tags)
}

/// Decode the tag header at `pos` and borrow its payload.
pub fn read_tag_at(bytes: &[u8], pos: usize) -> FifResult<Tag<'_>> {
    let header = bytes
        .get(pos..pos + HEADER_LEN)
        .ok_or(FifError::Truncated { offset: pos })?;
    let mut cur = BeCursor::new(header);
    let kind = cur.i32()?;
    let dtype = cur.i32()?;
    let size = cur.i32()?;
    let next = cur.i32()?;

    if size < 0 {
        return Err(FifError::Malformed(format!(
            "tag {kind} at {pos} has negative size {size}"
        )));
    }
    let start = pos + HEADER_LEN;
    let data = bytes
        .get(start..start + size as usize)
        .ok_or(FifError::Truncated { offset: start })?;

    Ok(Tag {
        kind,
        dtype,
        next,
        pos,
        data,
    })
}

// ---------------------------------------------------------------------------
// Payload decoding
// ---------------------------------------------------------------------------

/// Unpacked channel-info record as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChInfoRecord {
    pub scan_no: i32,
    pub log_no: i32,
    pub kind: i32,
    pub range: f32,
    pub cal: f32,
    pub coil_type: i32,
    pub loc: [f32; 12],
    pub unit: i32,
    pub unit_mul: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId {
    pub version: i32,
    pub machid: [i32; 2],
    pub secs: i32,
    pub usecs: i32,
}

impl<'a> Tag<'a> {
    fn expect_type(&self, expected: i32) -> FifResult<()> {
        if self.dtype == expected {
            Ok(())
        } else {
            Err(FifError::Malformed(format!(
                "tag {} at {} has type {}, expected {expected}",
                self.kind, self.pos, self.dtype
            )))
        }
    }

    fn words<const N: usize>(&self) -> FifResult<impl Iterator<Item = [u8; N]> + 'a> {
        if self.data.len() % N != 0 {
            return Err(FifError::Malformed(format!(
                "tag {} at {}: payload of {} bytes is not a multiple of {N}",
                self.kind,
                self.pos,
                self.data.len()
            )));
        }
        Ok(self.data.chunks_exact(N).map(|chunk| {
            let mut word = [0u8; N];
            word.copy_from_slice(chunk);
            word
        }))
    }

    fn first<T: Copy>(&self, values: Vec<T>) -> FifResult<T> {
        values.first().copied().ok_or_else(|| {
            FifError::Malformed(format!("tag {} at {} is empty", self.kind, self.pos))
        })
    }

    pub fn as_i32s(&self) -> FifResult<Vec<i32>> {
        self.expect_type(dtype::INT)?;
        Ok(self.words::<4>()?.map(i32::from_be_bytes).collect())
    }

    pub fn as_i32(&self) -> FifResult<i32> {
        let values = self.as_i32s()?;
        self.first(values)
    }

    pub fn as_f32s(&self) -> FifResult<Vec<f32>> {
        self.expect_type(dtype::FLOAT)?;
        Ok(self.words::<4>()?.map(f32::from_be_bytes).collect())
    }

    pub fn as_f32(&self) -> FifResult<f32> {
        let values = self.as_f32s()?;
        self.first(values)
    }

    pub fn as_f64s(&self) -> FifResult<Vec<f64>> {
        self.expect_type(dtype::DOUBLE)?;
        Ok(self.words::<8>()?.map(f64::from_be_bytes).collect())
    }

    /// Decode any scalar numeric payload (short, int, float, double) as `f64`.
    pub fn to_f64s(&self) -> FifResult<Vec<f64>> {
        match self.dtype {
            dtype::SHORT => Ok(self
                .words::<2>()?
                .map(|w| i16::from_be_bytes(w) as f64)
                .collect()),
            dtype::INT => Ok(self
                .words::<4>()?
                .map(|w| i32::from_be_bytes(w) as f64)
                .collect()),
            dtype::FLOAT => Ok(self
                .words::<4>()?
                .map(|w| f32::from_be_bytes(w) as f64)
                .collect()),
            dtype::DOUBLE => self.as_f64s(),
            t if t & dtype::MATRIX_MASK != 0 => Err(FifError::Unsupported(format!(
                "matrix-coded payload (type {t:#x}) in tag {}",
                self.kind
            ))),
            t => Err(FifError::Unsupported(format!(
                "payload type {t} in tag {} is not numeric",
                self.kind
            ))),
        }
    }

    /// Any numeric scalar payload as a single `f64`.
    pub fn to_f64(&self) -> FifResult<f64> {
        let values = self.to_f64s()?;
        self.first(values)
    }

    pub fn as_str(&self) -> FifResult<String> {
        self.expect_type(dtype::STRING)?;
        Ok(c_string(self.data))
    }

    pub fn as_ch_info(&self) -> FifResult<ChInfoRecord> {
        self.expect_type(dtype::CH_INFO_STRUCT)?;
        if self.data.len() < CH_INFO_LEN {
            return Err(FifError::Truncated { offset: self.pos });
        }
        let mut cur = BeCursor::new(self.data);
        let scan_no = cur.i32()?;
        let log_no = cur.i32()?;
        let kind = cur.i32()?;
        let range = cur.f32()?;
        let cal = cur.f32()?;
        let coil_type = cur.i32()?;
        let mut loc = [0f32; 12];
        for slot in &mut loc {
            *slot = cur.f32()?;
        }
        let unit = cur.i32()?;
        let unit_mul = cur.i32()?;
        let name = c_string(cur.bytes(16)?);

        Ok(ChInfoRecord {
            scan_no,
            log_no,
            kind,
            range,
            cal,
            coil_type,
            loc,
            unit,
            unit_mul,
            name,
        })
    }

    pub fn as_file_id(&self) -> FifResult<FileId> {
        self.expect_type(dtype::ID_STRUCT)?;
        let mut cur = BeCursor::new(self.data);
        Ok(FileId {
            version: cur.i32()?,
            machid: [cur.i32()?, cur.i32()?],
            secs: cur.i32()?,
            usecs: cur.i32()?,
        })
    }
}

/// Text up to the first NUL, lossy on invalid UTF-8.
fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Big-endian cursor
// ---------------------------------------------------------------------------

struct BeCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BeCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> FifResult<&'a [u8]> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(FifError::Truncated { offset: self.pos })?;
        self.pos += n;
        Ok(slice)
    }

    fn word(&mut self) -> FifResult<[u8; 4]> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.bytes(4)?);
        Ok(word)
    }

    fn i32(&mut self) -> FifResult<i32> {
        Ok(i32::from_be_bytes(self.word()?))
    }

    fn f32(&mut self) -> FifResult<f32> {
        Ok(f32::from_be_bytes(self.word()?))
    }
}
