use std::path::Path;

use super::fiff::{self, FifError, FifResult};
use super::model::RawSegment;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Extensions the open dialog offers.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["fif", "fiff"];

/// Load a recording segment from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.fif` / `.fiff` – raw FIF with optional annotations, fully preloaded
///
/// Compressed `.fif.gz` files are rejected; decompress them first.
pub fn load_file(path: &Path) -> FifResult<RawSegment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let segment = match ext.as_str() {
        "fif" | "fiff" => fiff::read_raw(path)?,
        "gz" => {
            return Err(FifError::Unsupported(
                "compressed FIF files (.fif.gz)".to_string(),
            ))
        }
        other => {
            return Err(FifError::Unsupported(format!(
                "file extension .{other}"
            )))
        }
    };

    log::info!(
        "Loaded {}: {} channels at {} Hz, {:.1} s, {} annotations",
        path.display(),
        segment.n_channels(),
        segment.sfreq(),
        segment.duration(),
        segment.annotations.len()
    );
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("recording.edf")).unwrap_err();
        assert!(matches!(err, FifError::Unsupported(_)));
        assert!(err.to_string().contains(".edf"));
    }

    #[test]
    fn test_compressed_rejected() {
        assert!(matches!(
            load_file(Path::new("seg_raw.fif.gz")),
            Err(FifError::Unsupported(_))
        ));
    }

    #[test]
    fn test_missing_fif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg_annotated_raw.fif");
        assert!(matches!(load_file(&path), Err(FifError::NotFound { .. })));
    }

    #[test]
    fn test_garbage_fif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.FIF");
        std::fs::write(&path, b"this is not a fif file at all").unwrap();
        assert!(matches!(load_file(&path), Err(FifError::NotFif)));
    }
}
