use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::Annotations;

// ---------------------------------------------------------------------------
// Annotation export
// ---------------------------------------------------------------------------

const HEADER: [&str; 3] = ["onset", "duration", "description"];

#[derive(Debug, Serialize)]
struct AnnotationRow<'a> {
    onset: f64,
    duration: f64,
    description: &'a str,
}

/// Write annotations as `onset,duration,description` rows (seconds from the
/// first sample). The header is written even when there are no rows.
pub fn write_annotations_csv<W: Write>(out: W, annotations: &Annotations) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer
        .write_record(HEADER)
        .context("writing annotation header")?;
    for a in annotations.iter() {
        writer
            .serialize(AnnotationRow {
                onset: a.onset,
                duration: a.duration,
                description: &a.description,
            })
            .context("writing annotation row")?;
    }
    writer.flush().context("flushing annotation CSV")?;
    Ok(())
}

pub fn export_annotations(path: &Path, annotations: &Annotations) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_annotations_csv(file, annotations)?;
    log::info!(
        "Exported {} annotations to {}",
        annotations.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Annotation;

    #[test]
    fn test_csv_layout() {
        let ann = Annotations::new(vec![
            Annotation {
                onset: 10.5,
                duration: 0.25,
                description: "blink".into(),
            },
            Annotation {
                onset: 3.0,
                duration: 0.0,
                description: "eyes, closed".into(),
            },
        ]);
        let mut buf = Vec::new();
        write_annotations_csv(&mut buf, &ann).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "onset,duration,description\n3.0,0.0,\"eyes, closed\"\n10.5,0.25,blink\n"
        );
    }

    #[test]
    fn test_empty_export_writes_header() {
        let mut buf = Vec::new();
        write_annotations_csv(&mut buf, &Annotations::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "onset,duration,description\n");
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blinks.csv");
        let ann = Annotations::new(vec![Annotation {
            onset: 1.0,
            duration: 0.5,
            description: "blink".into(),
        }]);
        export_annotations(&path, &ann).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("onset,duration,description\n"));
    }
}
