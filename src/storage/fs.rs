use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::AuthError;

pub const DIR_MODE: u32 = 0o700;
pub const FILE_MODE: u32 = 0o600;

/// Create `dir` with owner-only access, or tighten it if it already exists
/// with a looser mode.
pub fn ensure_private_dir(dir: &Path) -> Result<(), AuthError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        set_mode(dir, DIR_MODE)?;
        debug!("Created directory {} with permissions {:o}", dir.display(), DIR_MODE);
        return Ok(());
    }
    tighten(dir, DIR_MODE)
}

/// Create `path` holding `initial` with owner-only read/write, or tighten
/// an existing file in place.
pub fn ensure_private_file(path: &Path, initial: &str) -> Result<(), AuthError> {
    if !path.exists() {
        write_atomic(path, initial)?;
        debug!("Created file {} with permissions {:o}", path.display(), FILE_MODE);
        return Ok(());
    }
    tighten(path, FILE_MODE)
}

/// Replace `path` with `contents` via a sibling temp file and rename, so a
/// crash mid-write never leaves a truncated record behind.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), AuthError> {
    let dir = path.parent().ok_or_else(|| AuthError::Storage {
        path: path.to_path_buf(),
        detail: "credential path has no parent directory".into(),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = write_private(&tmp_path, contents).and_then(|()| {
        std::fs::rename(&tmp_path, path).map_err(AuthError::from)
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn write_private(path: &Path, contents: &str) -> Result<(), AuthError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    // The umask may have masked bits off at creation; make the mode exact.
    set_mode(path, FILE_MODE)
}

fn tighten(path: &Path, mode: u32) -> Result<(), AuthError> {
    match current_mode(path)? {
        Some(current) if current != mode => {
            set_mode(path, mode)?;
            debug!(
                "Adjusted permissions of {} from {:o} to {:o}",
                path.display(),
                current,
                mode
            );
        }
        _ => debug!("{} already has permissions {:o}", path.display(), mode),
    }
    Ok(())
}

/// Permission bits of `path`, or `None` on platforms without POSIX modes.
pub fn current_mode(path: &Path) -> Result<Option<u32>, AuthError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
        Ok(Some(mode))
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(None)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), AuthError> {
    Ok(())
}
