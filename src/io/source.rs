// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Source descriptors handed to adapters.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::core::{ConvertError, Result};

/// Number of leading bytes available to detection.
pub const HEADER_LEN: usize = 4096;

/// A source file with its leading bytes preloaded.
///
/// Detection only ever looks at [`header`](Self::header) and the path;
/// `read` implementations open the file themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    path: PathBuf,
    header: Vec<u8>,
    len: u64,
}

impl SourceHandle {
    /// Open `path` and read its first [`HEADER_LEN`] bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| ConvertError::io(format!("opening {}", path.display()), &e))?;
        let len = file
            .metadata()
            .map_err(|e| ConvertError::io(format!("reading metadata of {}", path.display()), &e))?
            .len();

        let mut header = Vec::with_capacity(HEADER_LEN.min(len as usize));
        (&mut file)
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .map_err(|e| ConvertError::io(format!("reading header of {}", path.display()), &e))?;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            len,
        })
    }

    /// Describe in-memory bytes as if they were a file at `path`.
    ///
    /// Only the first [`HEADER_LEN`] bytes are kept; the path is not opened.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            header: bytes[..bytes.len().min(HEADER_LEN)].to_vec(),
            len: bytes.len() as u64,
        }
    }

    /// Path of the source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leading bytes of the source.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Leading bytes decoded as UTF-8, replacing invalid sequences.
    pub fn header_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.header)
    }

    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lower-cased file extension.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// File stem, used as the default model name.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string()
    }

    /// Read the whole file as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| ConvertError::io(format!("reading {}", self.path.display()), &e))
    }
}
