//! Append-only CSV log of answered questions.

#[cfg(test)]
mod tests;

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::{RagError, Result};

pub const HEADER: &str = "datetime,question,answer";
const HEADER_FIELDS: [&str; 3] = ["datetime", "question", "answer"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const FENCE: &str = "```";

#[derive(Debug)]
pub struct QueryLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl QueryLogger {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one `(timestamp, question, answer)` row, writing the header first
    /// if the file is new or empty.
    pub fn log(&self, question: &str, answer: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| RagError::Other(anyhow::anyhow!("query log lock poisoned")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(HEADER_FIELDS).map_err(csv_error)?;
        }
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                timestamp.as_str(),
                question,
                truncate_after_first_block(answer),
            ])
            .map_err(csv_error)?;
        writer.flush()?;

        debug!("Logged query to {}", self.path.display());
        Ok(())
    }
}

/// Cut the answer right after the closing fence of its first code block.
pub fn truncate_after_first_block(answer: &str) -> &str {
    let Some(open) = answer.find(FENCE) else {
        return answer;
    };
    let after_open = open + FENCE.len();
    match answer[after_open..].find(FENCE) {
        Some(close) => &answer[..after_open + close + FENCE.len()],
        None => answer,
    }
}

fn csv_error(err: csv::Error) -> RagError {
    RagError::Other(anyhow::Error::new(err).context("Failed to write query log row"))
}
