use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::row::ExportRow;
use crate::settings::DisplayTimezone;
use crate::{AppError, Result};

/// Append-only CSV output for one export.
///
/// The header is written on creation. A sink ends either with [`finish`],
/// which flushes and keeps the file, or [`discard`], which removes it. A
/// failed final flush also removes the file.
///
/// [`finish`]: CsvSink::finish
/// [`discard`]: CsvSink::discard
pub struct CsvSink<W: Write = File> {
    writer: csv::Writer<W>,
    path: PathBuf,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create(path: &Path, timezone: DisplayTimezone) -> Result<Self> {
        let file = File::create(path).map_err(|e| AppError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::with_writer(file, path, timezone)
    }
}

impl<W: Write> CsvSink<W> {
    /// `path` is the file behind `writer`; it is removed on discard.
    fn with_writer(writer: W, path: &Path, timezone: DisplayTimezone) -> Result<Self> {
        let mut sink = Self {
            writer: csv::Writer::from_writer(writer),
            path: path.to_path_buf(),
            rows: 0,
        };
        if let Err(e) = sink.writer.write_record(ExportRow::header(timezone)) {
            sink.discard();
            return Err(AppError::Csv(e.to_string()));
        }
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_row(&mut self, row: &ExportRow) -> Result<()> {
        self.writer
            .write_record(row.fields())
            .map_err(|e| AppError::Csv(e.to_string()))?;
        self.rows += 1;
        debug!(row = ?row.fields(), "wrote row");
        Ok(())
    }

    /// Flush everything to disk; returns the number of data rows.
    pub fn finish(mut self) -> Result<usize> {
        if let Err(e) = self.writer.flush() {
            let path = self.path.display().to_string();
            self.discard();
            return Err(AppError::WriteFile { path, source: e });
        }
        Ok(self.rows)
    }

    /// Close and delete the file. A failed delete is logged, not returned.
    pub fn discard(self) {
        let CsvSink { writer, path, .. } = self;
        drop(writer);

        if let Err(e) = fs::remove_file(&path) {
            error!(path = %path.display(), error = %e, "failed to delete partial export");
        }
    }
}
