use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::WorkUnit;
use crate::error::OutputWriteError;
use crate::models::MeasurementRecord;

// ---

/// Writes one CSV file per unit of work under `out_dir`.
pub struct CsvSink {
    out_dir: PathBuf,
}

impl CsvSink {
    // ---
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, unit: WorkUnit) -> PathBuf {
        self.out_dir.join(unit.file_name())
    }

    /// Write `records` with a header row; `None` fields become empty cells.
    pub fn write(
        &self,
        unit: WorkUnit,
        records: &[MeasurementRecord],
    ) -> Result<usize, OutputWriteError> {
        // ---
        fs::create_dir_all(&self.out_dir).map_err(|e| OutputWriteError::Io {
            path: self.out_dir.display().to_string(),
            source: e,
        })?;

        let path = self.path_for(unit);
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(|e| OutputWriteError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        info!("Saved: {} ({} records)", path.display(), records.len());
        Ok(records.len())
    }
}
