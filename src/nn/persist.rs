use std::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persist io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist error: {0} already exists")]
    Exists(PathBuf),
}

/// An object persistence service.
pub trait Archive {
    /// Write `value` to `path`.
    /// Fails with [`PersistError::Exists`] if the file exists and `overwrite` is off.
    fn save<M: Serialize>(
        &self,
        value: &M,
        path: &Path,
        overwrite: bool,
    ) -> Result<(), PersistError>;

    /// Read a value back from `path`.
    fn load<M: DeserializeOwned>(&self, path: &Path) -> Result<M, PersistError>;
}

/// Stores objects as JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonArchive {
    pretty: bool,
}

impl JsonArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the written documents.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Archive for JsonArchive {
    fn save<M: Serialize>(
        &self,
        value: &M,
        path: &Path,
        overwrite: bool,
    ) -> Result<(), PersistError> {
        let file = match overwrite {
            true => File::create(path)?,
            false => match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    return Err(PersistError::Exists(path.to_path_buf()));
                }
                Err(err) => return Err(err.into()),
            },
        };
        let mut writer = BufWriter::new(file);
        match self.pretty {
            true => serde_json::to_writer_pretty(&mut writer, value)?,
            false => serde_json::to_writer(&mut writer, value)?,
        }
        writer.flush()?;
        log::debug!("saved {}", path.display());
        Ok(())
    }

    fn load<M: DeserializeOwned>(&self, path: &Path) -> Result<M, PersistError> {
        let reader = BufReader::new(File::open(path)?);
        let value = serde_json::from_reader(reader)?;
        log::debug!("loaded {}", path.display());
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> PathBuf {
    #[derive(Debug)]
    struct TempFile;
    let id = uid::Id::<TempFile>::new();
    std::env::temp_dir().join(format!("spindle-{name}-{}-{id}.json", std::process::id()))
}
