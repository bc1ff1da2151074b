//! Result file output
//!
//! Writes a finalized result set twice: as newline-delimited JSON
//! (one region per line, empty regions omitted) and as a single JSON array.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::OutputConfig;
use crate::locality::RegionResult;
use crate::Result;

/// Writes result sets to the JSONL and JSON output files
#[derive(Debug, Clone)]
pub struct FileSink {
    jsonl_path: PathBuf,
    json_path: PathBuf,
}

impl FileSink {
    pub fn new(jsonl_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_path: jsonl_path.into(),
            json_path: json_path.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.jsonl_path, &config.json_path)
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    /// Overwrite both output files with the given result set
    pub fn write(&self, results: &[RegionResult]) -> Result<()> {
        let lines = self.write_jsonl(results)?;
        self.write_json(results)?;

        info!(
            "Wrote {} regions ({} non-empty) to {} and {}",
            results.len(),
            lines,
            self.jsonl_path.display(),
            self.json_path.display()
        );
        Ok(())
    }

    fn write_jsonl(&self, results: &[RegionResult]) -> Result<usize> {
        let mut writer = BufWriter::new(create_file(&self.jsonl_path)?);
        let mut lines = 0;

        for result in results.iter().filter(|r| !r.is_empty()) {
            serde_json::to_writer(&mut writer, result)?;
            writer.write_all(b"\n")?;
            lines += 1;
        }

        writer.flush()?;
        debug!("JSONL output: {} lines", lines);
        Ok(lines)
    }

    fn write_json(&self, results: &[RegionResult]) -> Result<()> {
        let mut writer = BufWriter::new(create_file(&self.json_path)?);
        serde_json::to_writer(&mut writer, results)?;
        writer.flush()?;
        Ok(())
    }
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}
