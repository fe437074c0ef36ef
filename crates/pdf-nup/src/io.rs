//! Document and input-list I/O

use crate::render::LopdfToolkit;
use crate::sort::sort_naturally;
use crate::toolkit::{PdfToolkit, ToolkitError};
use crate::types::*;
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || {
        Document::load_mem(&bytes).map_err(ToolkitError::from)
    })
    .await??;
    Ok(doc)
}

/// Save the merged document
pub async fn save_pdf(doc: Document, path: impl AsRef<Path>) -> Result<()> {
    write_output(Arc::new(LopdfToolkit::new()), doc, path).await
}

/// Serialize a toolkit's output document to `path`
pub async fn write_output<T: PdfToolkit>(
    toolkit: Arc<T>,
    mut output: T::Output,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        toolkit.write(&mut output, &mut writer)?;
        Ok::<_, ToolkitError>(writer)
    })
    .await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Expand an input argument into the files to merge.
///
/// A directory yields its `.pdf` files (any case, not recursive), naturally
/// sorted by file name. Any other path is returned as-is.
pub async fn collect_inputs(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if !tokio::fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let candidate = entry.path();
        if has_pdf_extension(&candidate) && entry.file_type().await?.is_file() {
            files.push(candidate);
        }
    }

    sort_naturally(&mut files);
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
