use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::error::TopologyError;
use crate::transport::PtrRecord;

/// Append-only destination for resolved records, in scan order.
pub trait RecordSink {
	fn append(&mut self, record: &PtrRecord) -> Result<()>;

	/// Called after every completed batch.
	fn end_batch(&mut self) -> Result<()> {
		Ok(())
	}

	/// Write the end-of-stream marker and make the stream visible.
	fn finish(&mut self) -> Result<()>;

	/// Close an interrupted stream without replacing a previous complete one.
	fn abort(&mut self) -> Result<()>;
}

/// Writes a JSON array of records terminated by a `null` element.
///
/// The stream is written to `<path>.partial` and flushed after every
/// batch; `finish` closes the array and renames it into place, so a
/// previous complete stream is only replaced by another complete one.
/// `abort` closes the array but leaves it at `<path>.partial`.
pub struct JsonRecordWriter {
	writer: Option<BufWriter<File>>,
	partial: PathBuf,
	path: PathBuf,
}

impl JsonRecordWriter {
	pub fn create(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let mut partial = path.clone().into_os_string();
		partial.push(".partial");
		let partial = PathBuf::from(partial);

		let file = File::create(&partial)
			.with_context(|| format!("failed to create '{}'", partial.display()))?;
		let mut writer = BufWriter::new(file);
		writer.write_all(b"[")?;
		Ok(Self { writer: Some(writer), partial, path })
	}

	fn writer(&mut self) -> Result<&mut BufWriter<File>> {
		self.writer.as_mut()
			.ok_or_else(|| anyhow::anyhow!("record stream '{}' already finished", self.path.display()))
	}

	fn close(&mut self) -> Result<()> {
		let mut writer = self.writer.take()
			.ok_or_else(|| anyhow::anyhow!("record stream '{}' already finished", self.path.display()))?;
		writer.write_all(b"null]")?;
		writer.flush()?;
		writer.get_ref().sync_all()?;
		Ok(())
	}

	pub fn partial_path(&self) -> &Path {
		&self.partial
	}
}

impl RecordSink for JsonRecordWriter {
	fn append(&mut self, record: &PtrRecord) -> Result<()> {
		let writer = self.writer()?;
		serde_json::to_writer(&mut *writer, record)?;
		writer.write_all(b",")?;
		Ok(())
	}

	fn end_batch(&mut self) -> Result<()> {
		self.writer()?.flush()?;
		Ok(())
	}

	fn finish(&mut self) -> Result<()> {
		self.close()?;
		std::fs::rename(&self.partial, &self.path)
			.with_context(|| format!("failed to move record stream to '{}'", self.path.display()))?;
		debug!(path = %self.path.display(), "record stream complete");
		Ok(())
	}

	fn abort(&mut self) -> Result<()> {
		self.close()?;
		warn!(path = %self.partial.display(), "incomplete record stream left in place");
		Ok(())
	}
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
	pub records: Vec<PtrRecord>,
	pub batches: usize,
	pub finished: bool,
	pub aborted: bool,
}

#[cfg(test)]
impl RecordSink for MemorySink {
	fn append(&mut self, record: &PtrRecord) -> Result<()> {
		self.records.push(record.clone());
		Ok(())
	}

	fn end_batch(&mut self) -> Result<()> {
		self.batches += 1;
		Ok(())
	}

	fn finish(&mut self) -> Result<()> {
		self.finished = true;
		Ok(())
	}

	fn abort(&mut self) -> Result<()> {
		self.aborted = true;
		Ok(())
	}
}

/// Load a record stream written by `JsonRecordWriter`.
///
/// Any unreadable or structurally invalid stream, including one without
/// the trailing `null` marker, is `MalformedInput`.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Option<PtrRecord>>, TopologyError> {
	let path = path.as_ref();
	let malformed = |reason: String| TopologyError::MalformedInput {
		path: path.display().to_string(),
		reason,
	};

	let content = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
	let mut records: Vec<Option<PtrRecord>> = serde_json::from_str(&content)
		.map_err(|e| malformed(e.to_string()))?;

	match records.last() {
		Some(None) => {
			records.pop();
			Ok(records)
		}
		_ => Err(malformed("missing end-of-stream marker".to_string())),
	}
}
