use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::PipelineError;
use crate::filters::FilterStep;
use crate::types::ResultRow;

pub const RESULT_HEADER: [&str; 2] = ["Index", "Computed Value"];

/// Row-oriented result table: `Index,Computed Value`, one line per sample.
pub struct ResultTableWriter<W: Write> {
    inner: W,
    rows: usize,
}

impl ResultTableWriter<BufWriter<File>> {
    /// Create the file (and missing parent directories) and write the header.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> ResultTableWriter<W> {
    pub fn new(mut inner: W) -> io::Result<Self> {
        writeln!(inner, "{}", RESULT_HEADER.join(","))?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write_row(&mut self, row: &ResultRow) -> io::Result<()> {
        writeln!(self.inner, "{},{}", row.index, row.value)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// JSON-lines dump of every intermediate, one `FilterStep` per row.
pub struct TraceWriter<W: Write> {
    inner: W,
}

impl TraceWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Serialization failures surface as `PipelineError::Trace`, write
    /// failures as `PipelineError::Io`.
    pub fn write_step(&mut self, step: &FilterStep) -> Result<(), PipelineError> {
        let line = serde_json::to_vec(step)?;
        self.inner.write_all(&line)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
