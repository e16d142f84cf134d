//! Atomic file replacement.
//!
//! Writes go to a temporary sibling file which is synced and then renamed
//! over the target, so readers see either the old content or the new
//! content and never a torn file. Source and destination share a
//! directory, so the rename stays on one filesystem.
//!
//! Errors are plain [`std::io::Error`]s carrying the path in their message;
//! callers map them onto the [`HolefillError`](crate::error::HolefillError)
//! variant that fits their concern (cache, output, history).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| with_path(e, "create directory", parent))?;
    }

    let temp_path = temp_path_for(path)?;
    if let Err(e) = write_and_sync(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    replace(&temp_path, path)
}

/// Atomically replace `path` with a string.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
    atomic_write(path, content.as_bytes())
}

/// `.{name}.{pid}.tmp` next to the target.
fn temp_path_for(target: &Path) -> io::Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid file path '{}'", target.display()),
            )
        })?;
    let parent = target.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!(".{}.{}.tmp", name, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).map_err(|e| with_path(e, "create", path))?;
    file.write_all(content)
        .map_err(|e| with_path(e, "write", path))?;
    file.sync_all().map_err(|e| with_path(e, "sync", path))
}

fn replace(source: &Path, target: &Path) -> io::Result<()> {
    let renamed = fs::rename(source, target).or_else(|e| {
        // Windows refuses to rename over an existing file.
        if cfg!(windows) && target.exists() {
            fs::remove_file(target)?;
            fs::rename(source, target)
        } else {
            Err(e)
        }
    });

    if let Err(e) = renamed {
        let _ = fs::remove_file(source);
        return Err(with_path(e, "replace", target));
    }

    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn with_path(err: io::Error, action: &str, path: &Path) -> io::Error {
    io::Error::new(
        err.kind(),
        format!("failed to {} '{}': {}", action, path.display(), err),
    )
}
