// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! All-or-nothing file output.
//!
//! Bytes go to a hidden temporary file next to the target. The temporary
//! file is renamed over the target on [`AtomicFile::commit`]; dropping an
//! uncommitted `AtomicFile` removes it, so a failed or cancelled write
//! never leaves a partial target behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::{ConvertError, Result};

/// Buffered writer whose output only appears at the target on commit.
pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
    written: u64,
}

impl AtomicFile {
    /// Create a temporary sibling of `target`.
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".geocodec-")
            .suffix(".partial")
            .tempfile_in(&parent)
            .map_err(|e| ConvertError::io(format!("creating temporary file in {}", parent.display()), &e))?;
        Ok(Self {
            target,
            writer: BufWriter::new(temp),
            written: 0,
        })
    }

    /// Final path of the file.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush, sync, and move the file into place.
    pub fn commit(self) -> Result<u64> {
        let context = format!("writing {}", self.target.display());
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| ConvertError::io(context.clone(), e.error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ConvertError::io(context.clone(), &e))?;
        temp.persist(&self.target)
            .map_err(|e| ConvertError::io(context, &e.error))?;
        Ok(self.written)
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Write `target` through `body`; the target only appears if `body` succeeds.
pub fn write_atomic<P, F>(target: P, body: F) -> Result<u64>
where
    P: AsRef<Path>,
    F: FnOnce(&mut AtomicFile) -> Result<()>,
{
    let mut file = AtomicFile::create(target)?;
    body(&mut file)?;
    file.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geocodec_atomic_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_commit_creates_target() {
        let dir = temp_dir("commit");
        let target = dir.join("out.txt");
        let n = write_atomic(&target, |f| {
            f.write_all(b"hello")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(n, 5);
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
        assert_eq!(entries(&dir), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failure_leaves_nothing() {
        let dir = temp_dir("failure");
        let target = dir.join("out.txt");
        let result = write_atomic(&target, |f| {
            f.write_all(b"partial")?;
            Err(ConvertError::cancelled("write"))
        });
        assert!(result.is_err());
        assert!(!target.exists());
        assert_eq!(entries(&dir), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_parent() {
        let result = AtomicFile::create("/nonexistent/geocodec/dir/out.txt");
        assert!(matches!(result, Err(ConvertError::Io { .. })));
    }
}
