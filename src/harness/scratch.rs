//! Scratch directories for compile tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Directory holding one test program's source and image.
///
/// The scoped variant removes itself on drop, whatever the outcome of the
/// test. The kept variant survives the run so the files can be inspected
/// in debug mode.
#[derive(Debug)]
pub enum ScratchDir {
    Scoped(TempDir),
    Kept(PathBuf),
}

impl ScratchDir {
    /// Create a fresh directory under `base` (or the system temp dir).
    pub fn create(base: Option<&Path>, keep: bool) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("confprobe-");
        let dir = match base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        if keep {
            Ok(ScratchDir::Kept(dir.keep()))
        } else {
            Ok(ScratchDir::Scoped(dir))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ScratchDir::Scoped(dir) => dir.path(),
            ScratchDir::Kept(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_dir_is_removed_on_drop() {
        let base = TempDir::new().unwrap();
        let scratch = ScratchDir::create(Some(base.path()), false).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("testlib.c"), "int main(void) { return 0; }").unwrap();
        assert!(path.is_dir());

        drop(scratch);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn kept_dir_survives_drop() {
        let base = TempDir::new().unwrap();
        let scratch = ScratchDir::create(Some(base.path()), true).unwrap();
        let path = scratch.path().to_path_buf();

        drop(scratch);

        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("confprobe-"));
    }
}
