use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::graph::Document;

pub fn reset_output_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "Cleared previous output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to clear output directory {}", path.display()))
        }
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory {}", path.display()))
}

pub fn write_documents(dir: &Path, documents: &[Document]) -> Result<()> {
    for document in documents {
        let path = dir.join(&document.file_name);
        fs::write(&path, &document.contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

pub fn write_graph(dir: &Path, documents: &[Document]) -> Result<()> {
    reset_output_dir(dir)?;
    write_documents(dir, documents)
}
