/// FIF container: the tag/block binary format segment files are stored in.
///
/// ```text
///  bytes ──► tag::TagReader ──► Vec<Tag> ──► tree::Node (blocks) ──► raw::read_raw
///                                                                       │
///                                                                       ▼
///                                                                  RawSegment
/// ```
///
/// `write` is the inverse direction, used by the sample generator and tests.
use std::path::PathBuf;

use thiserror::Error;

pub mod raw;
pub mod tag;
pub mod tree;
pub mod write;

pub use raw::{read_raw, read_raw_bytes};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FifError {
    #[error("file {} was not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("not a FIF file (first tag is not a file id)")]
    NotFif,

    #[error("file truncated at byte offset {offset}")]
    Truncated { offset: usize },

    #[error("malformed FIF file: {0}")]
    Malformed(String),

    #[error("unsupported FIF content: {0}")]
    Unsupported(String),
}

pub type FifResult<T> = Result<T, FifError>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Tag kinds.
pub mod kind {
    pub const FILE_ID: i32 = 100;
    pub const DIR_POINTER: i32 = 101;
    pub const BLOCK_START: i32 = 104;
    pub const BLOCK_END: i32 = 105;
    pub const NOP: i32 = 108;

    pub const NCHAN: i32 = 200;
    pub const SFREQ: i32 = 201;
    pub const CH_INFO: i32 = 203;
    pub const MEAS_DATE: i32 = 204;
    pub const COMMENT: i32 = 206;
    pub const FIRST_SAMPLE: i32 = 208;
    pub const LOWPASS: i32 = 219;
    pub const HIGHPASS: i32 = 223;
    pub const LINE_FREQ: i32 = 235;

    pub const DATA_BUFFER: i32 = 300;
    pub const DATA_SKIP: i32 = 301;
    pub const DATA_SKIP_SAMP: i32 = 303;

    pub const MNE_CH_NAME_LIST: i32 = 3507;
    pub const MNE_BASELINE_MIN: i32 = 3546;
    pub const MNE_BASELINE_MAX: i32 = 3547;
}

/// Block kinds carried by `BLOCK_START` / `BLOCK_END`.
pub mod block {
    pub const ROOT: i32 = 999;
    pub const MEAS: i32 = 100;
    pub const MEAS_INFO: i32 = 101;
    pub const RAW_DATA: i32 = 102;
    pub const CONTINUOUS_DATA: i32 = 112;
    pub const MNE_BAD_CHANNELS: i32 = 359;
    pub const MNE_ANNOTATIONS: i32 = 3810;
}

/// Payload data types.
pub mod dtype {
    pub const VOID: i32 = 0;
    pub const SHORT: i32 = 2;
    pub const INT: i32 = 3;
    pub const FLOAT: i32 = 4;
    pub const DOUBLE: i32 = 5;
    pub const STRING: i32 = 10;
    pub const CH_INFO_STRUCT: i32 = 30;
    pub const ID_STRUCT: i32 = 31;

    /// High bits flag matrix-coded payloads.
    pub const MATRIX_MASK: i32 = 0x4000_0000;
}

/// `next` field values.
pub const NEXT_SEQ: i32 = 0;
pub const NEXT_NONE: i32 = -1;
