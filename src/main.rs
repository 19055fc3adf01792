use std::path::Path;

use fif_viewer::app::EguiViewer;
use fif_viewer::config::{ViewerConfig, CONFIG_FILE};
use fif_viewer::data::loader;
use fif_viewer::session::{self, SEGMENT_PATH};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ViewerConfig::load_or_default(Path::new(CONFIG_FILE));
    let path = Path::new(SEGMENT_PATH);
    let viewer = EguiViewer {
        config,
        source_path: Some(path.to_path_buf()),
    };

    // A missing segment is reported on stdout and still exits cleanly
    session::run(path, loader::load_file, viewer, &mut std::io::stdout().lock())?;
    Ok(())
}
