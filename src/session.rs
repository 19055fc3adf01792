use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::fiff::{FifError, FifResult};
use crate::data::model::RawSegment;

/// Segment opened at startup, relative to the working directory.
pub const SEGMENT_PATH: &str = "seg_annotated_raw.fif";

// ---------------------------------------------------------------------------
// Load → display flow
// ---------------------------------------------------------------------------

/// Blocking display surface for a loaded segment. Consumed by `show`, so a
/// viewer can only ever be shown once.
pub trait Viewer {
    fn show(self, segment: RawSegment) -> Result<()>;
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Loaded and shown until the window closed.
    Displayed,
    /// The segment file does not exist; nothing was shown.
    FileNotFound,
}

/// Load the segment at `path` once and hand it to `viewer`.
///
/// A missing file prints `Error: The file <path> was not found.` to `out`
/// and returns [`Outcome::FileNotFound`]. Every other load or display failure
/// is returned as an error.
pub fn run<L, V, W>(path: &Path, load: L, viewer: V, out: &mut W) -> Result<Outcome>
where
    L: FnOnce(&Path) -> FifResult<RawSegment>,
    V: Viewer,
    W: Write,
{
    let segment = match load(path) {
        Ok(segment) => segment,
        Err(FifError::NotFound { .. }) => {
            log::error!("Segment file {} does not exist", path.display());
            writeln!(out, "Error: The file {} was not found.", path.display())
                .context("writing diagnostic")?;
            return Ok(Outcome::FileNotFound);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("loading {}", path.display()));
        }
    };

    viewer.show(segment).context("running viewer")?;
    Ok(Outcome::Displayed)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::data::fiff::write::write_raw;
    use crate::data::loader::load_file;
    use crate::data::model::{
        Annotation, Annotations, ChannelInfo, ChannelKind, MeasInfo,
    };

    #[derive(Default)]
    struct RecordingViewer {
        shown: RefCell<Vec<RawSegment>>,
    }

    impl Viewer for &RecordingViewer {
        fn show(self, segment: RawSegment) -> Result<()> {
            self.shown.borrow_mut().push(segment);
            Ok(())
        }
    }

    fn segment() -> RawSegment {
        RawSegment {
            info: MeasInfo {
                channels: vec![
                    ChannelInfo {
                        name: "Fp1".into(),
                        kind: ChannelKind::Eeg,
                        cal: 1.0,
                        unit: 107,
                        bad: false,
                    },
                    ChannelInfo {
                        name: "EOG-V".into(),
                        kind: ChannelKind::Eog,
                        cal: 1.0,
                        unit: 107,
                        bad: false,
                    },
                ],
                sfreq: 100.0,
                meas_date: None,
                highpass: None,
                lowpass: None,
                line_freq: None,
                bads: vec![],
            },
            first_samp: 0,
            data: vec![vec![1e-6; 300], vec![-2e-6; 300]],
            annotations: Annotations::new(vec![Annotation {
                onset: 1.0,
                duration: 0.25,
                description: "blink".into(),
            }]),
        }
    }

    #[test]
    fn test_missing_file_prints_message_and_skips_display() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SEGMENT_PATH);
        let viewer = RecordingViewer::default();
        let loads = Cell::new(0);
        let mut out = Vec::new();

        let outcome = run(
            &path,
            |p| {
                loads.set(loads.get() + 1);
                load_file(p)
            },
            &viewer,
            &mut out,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::FileNotFound);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Error: The file {} was not found.\n", path.display())
        );
        assert!(viewer.shown.borrow().is_empty());
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_valid_file_is_displayed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SEGMENT_PATH);
        write_raw(&path, &segment()).unwrap();

        let viewer = RecordingViewer::default();
        let loads = Cell::new(0);
        let mut out = Vec::new();
        let outcome = run(
            &path,
            |p| {
                loads.set(loads.get() + 1);
                load_file(p)
            },
            &viewer,
            &mut out,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Displayed);
        assert!(out.is_empty());
        assert_eq!(loads.get(), 1);
        let shown = viewer.shown.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].n_channels(), 2);
        assert_eq!(shown[0].n_times(), 300);
        assert_eq!(shown[0].annotations.len(), 1);
        assert_eq!(shown[0].info.channels[1].name, "EOG-V");
    }

    #[test]
    fn test_corrupt_file_is_an_error_without_display() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SEGMENT_PATH);
        std::fs::write(&path, [0u8; 64]).unwrap();

        let viewer = RecordingViewer::default();
        let mut out = Vec::new();
        let result = run(&path, load_file, &viewer, &mut out);

        assert!(result.is_err());
        assert!(out.is_empty());
        assert!(viewer.shown.borrow().is_empty());
    }

    #[test]
    fn test_viewer_failure_propagates() {
        struct FailingViewer;
        impl Viewer for FailingViewer {
            fn show(self, _segment: RawSegment) -> Result<()> {
                anyhow::bail!("no display available")
            }
        }

        let mut out = Vec::new();
        let result = run(Path::new("in-memory.fif"), |_| Ok(segment()), FailingViewer, &mut out);
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("no display available"));
    }
}
