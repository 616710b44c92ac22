use crate::error::Result;
use codesift_code_chunker::IngestedFile;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write ingested files as a pretty JSON array, creating parent directories
pub fn save_ingested(path: impl AsRef<Path>, files: &[IngestedFile]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, files)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!("Saved {} files to {}", files.len(), path.display());
    Ok(())
}

pub fn load_ingested(path: impl AsRef<Path>) -> Result<Vec<IngestedFile>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}
