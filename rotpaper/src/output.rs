//! Output-directory plumbing
//!
//! Figures land under `<out>/fig/` and tables under `<out>/tables/`, with
//! the root taken from `ROTPAPER_OUT` (default `./paper`). Every figure
//! function writes exactly one file per invocation through `figure`, which
//! guarantees the directory exists and fixes the naming scheme.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable pointing at the output root
pub const OUT_DIR_ENV: &str = "ROTPAPER_OUT";

/// Resolved output directories for one run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    fig_dir: PathBuf,
    table_dir: PathBuf,
}

impl OutputPaths {
    /// Root the outputs at an explicit directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            fig_dir: root.join("fig"),
            table_dir: root.join("tables"),
        }
    }

    /// Root the outputs at `$ROTPAPER_OUT`, defaulting to `./paper`.
    pub fn from_env() -> Self {
        let root = env::var(OUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("paper"));
        Self::new(root)
    }

    pub fn fig_dir(&self) -> &Path {
        &self.fig_dir
    }

    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    /// Path for one figure file, creating the figures directory on demand.
    pub fn figure(&self, name: &str) -> Result<PathBuf> {
        ensure_dir(&self.fig_dir)?;
        Ok(self.fig_dir.join(format!("{name}.svg")))
    }

    /// Path for one table file, creating the tables directory on demand.
    pub fn table(&self, file_name: &str) -> Result<PathBuf> {
        ensure_dir(&self.table_dir)?;
        Ok(self.table_dir.join(file_name))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write a string to disk, mapping failures to the output path.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figure_path_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputPaths::new(dir.path());
        let path = out.figure("test-fig").unwrap();
        assert!(out.fig_dir().is_dir());
        assert!(path.ends_with("fig/test-fig.svg"));
    }

    #[test]
    fn test_table_path_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputPaths::new(dir.path());
        let path = out.table("table1.txt").unwrap();
        assert!(out.table_dir().is_dir());
        assert!(path.ends_with("tables/table1.txt"));
    }

    #[test]
    fn test_write_text_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputPaths::new(dir.path());
        let path = out.table("note.txt").unwrap();
        write_text(&path, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
