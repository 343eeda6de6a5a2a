use std::fs;
use std::path::{Path, PathBuf};
use log::debug;

use crate::errors::{QuantError, Result};

/// Directory name used under the system temp dir when no scratch path is configured
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "StainQuantTemp";

/// File that marks a directory as owned by a scratch area
pub const SCRATCH_MARKER: &str = ".stain_quant_scratch";

/// Per-run storage for rendered result images.
///
/// Opening the area creates the directory, or empties one this tool created
/// earlier. A non-empty directory without the marker file is refused, and
/// clearing only ever removes regular files directly inside the directory.
#[derive(Debug)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let area = Self { dir: dir.as_ref().to_path_buf() };
        if !area.dir.is_dir() {
            fs::create_dir_all(&area.dir)?;
            area.mark()?;
        } else if area.is_marked() {
            area.clear()?;
        } else if fs::read_dir(&area.dir)?.next().is_none() {
            area.mark()?;
        } else {
            return Err(QuantError::ForeignScratch(area.dir));
        }
        Ok(area)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path for the rendered image of `source_name`
    pub fn result_path(&self, source_name: &str) -> PathBuf {
        self.dir.join(format!("{}_result.png", source_name))
    }

    /// Remove the regular files in the directory. Subdirectories are left alone.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
            return self.mark();
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() || entry.file_name() == SCRATCH_MARKER {
                continue;
            }
            fs::remove_file(entry.path())?;
            removed += 1;
        }

        debug!("Cleared {} files from scratch area {}", removed, self.dir.display());
        Ok(())
    }

    /// Number of entries currently in the directory, not counting the marker
    pub fn entry_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            if entry?.file_name() != SCRATCH_MARKER {
                count += 1;
            }
        }
        Ok(count)
    }

    fn is_marked(&self) -> bool {
        self.dir.join(SCRATCH_MARKER).is_file()
    }

    fn mark(&self) -> Result<()> {
        fs::write(self.dir.join(SCRATCH_MARKER), b"")?;
        Ok(())
    }
}

pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let scratch = ScratchArea::open(dir.path().join("scratch")).unwrap();
        assert!(scratch.path().is_dir());
        assert!(scratch.path().join(SCRATCH_MARKER).is_file());
        assert_eq!(scratch.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_empties_stale_results() {
        let dir = tempdir().unwrap();
        let scratch = ScratchArea::open(dir.path()).unwrap();
        fs::write(scratch.result_path("old.png"), b"stale").unwrap();
        fs::write(dir.path().join("notes.txt"), b"stale").unwrap();
        drop(scratch);

        let scratch = ScratchArea::open(dir.path()).unwrap();
        assert_eq!(scratch.entry_count().unwrap(), 0);
        assert!(scratch.path().join(SCRATCH_MARKER).is_file());
    }

    #[test]
    fn test_open_refuses_foreign_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("thesis.docx"), b"precious").unwrap();

        let err = ScratchArea::open(dir.path()).unwrap_err();

        assert!(matches!(err, QuantError::ForeignScratch(ref p) if p == dir.path()));
        assert!(dir.path().join("thesis.docx").is_file());
        assert!(!dir.path().join(SCRATCH_MARKER).exists());
    }

    #[test]
    fn test_clear_leaves_subdirectories_alone() {
        let dir = tempdir().unwrap();
        let scratch = ScratchArea::open(dir.path()).unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("keep.png"), b"keep").unwrap();
        fs::write(scratch.result_path("a.png"), b"stale").unwrap();

        scratch.clear().unwrap();

        assert!(nested.join("keep.png").is_file());
        assert!(!scratch.result_path("a.png").exists());
        assert_eq!(scratch.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_result_path_appends_suffix() {
        let dir = tempdir().unwrap();
        let scratch = ScratchArea::open(dir.path()).unwrap();
        assert_eq!(scratch.result_path("cells.tif"), dir.path().join("cells.tif_result.png"));
    }
}
