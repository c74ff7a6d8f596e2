#![deny(missing_docs)]

//! # Schema Writer
//!
//! Persists converted schemas. The pipeline only talks to [`SchemaSink`];
//! [`DirectorySink`] is the filesystem implementation used by the CLI.

use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for named schemas.
pub trait SchemaSink {
    /// Persists `schema` under `title`, replacing any previous one.
    fn write_schema(&mut self, title: &str, schema: &Value) -> AppResult<()>;
}

/// Writes `<title>.json` files into one directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Creates `dir` (recursively) if needed.
    pub fn create(dir: &Path) -> AppResult<Self> {
        fs::create_dir_all(dir).map_err(|source| AppError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// The file a title maps to. The title is used verbatim as the file stem.
    pub fn path_for(&self, title: &str) -> AppResult<PathBuf> {
        let invalid = title.is_empty()
            || title == "."
            || title == ".."
            || title.contains(['/', '\\', '\0']);
        if invalid {
            return Err(AppError::Write {
                path: self.dir.join(format!("{}.json", title)),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("title '{}' is not usable as a file name", title),
                ),
            });
        }
        Ok(self.dir.join(format!("{}.json", title)))
    }

    /// Files written so far, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Consumes the sink, returning the written files.
    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }
}

impl SchemaSink for DirectorySink {
    fn write_schema(&mut self, title: &str, schema: &Value) -> AppResult<()> {
        let path = self.path_for(title)?;
        let body = serde_json::to_string_pretty(schema).map_err(|e| AppError::Write {
            path: path.clone(),
            source: e.into(),
        })?;
        fs::write(&path, body).map_err(|source| AppError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote schema");
        self.written.push(path);
        Ok(())
    }
}
