//! Moving a finished temp recording to where the user wants it.
//!
//! No transcoding happens here: whatever extension the destination carries,
//! the bytes are the WAV the capture loop produced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::format::OutputFormat;

/// How the file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationMethod {
    /// Same filesystem: a single rename.
    Renamed,
    /// Different filesystem: copied, then the temp file deleted.
    Copied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub path: PathBuf,
    pub method: RelocationMethod,
}

/// Move `temp` to `dest`, overwriting `dest` if it exists.
///
/// The rename is attempted first; when it fails because the paths are on
/// different filesystems, the file is copied and the temp file removed.
pub fn relocate(temp: &Path, dest: &Path) -> Result<Relocation, RecorderError> {
    if !temp.is_file() {
        return Err(RecorderError::IoFailure(format!(
            "temp recording not found: {}",
            temp.display()
        )));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| RecorderError::IoFailure(format!("failed to create {}: {}", parent.display(), e)))?;
    }

    match fs::rename(temp, dest) {
        Ok(()) => {
            log::info!("Moved recording to {}", dest.display());
            Ok(Relocation {
                path: dest.to_path_buf(),
                method: RelocationMethod::Renamed,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("rename across filesystems, copying instead: {}", e);
            copy_then_delete(temp, dest)
        }
        Err(e) => Err(RecorderError::IoFailure(format!(
            "failed to move recording to {}: {}",
            dest.display(),
            e
        ))),
    }
}

fn copy_then_delete(temp: &Path, dest: &Path) -> Result<Relocation, RecorderError> {
    fs::copy(temp, dest)
        .map_err(|e| RecorderError::IoFailure(format!("failed to copy recording to {}: {}", dest.display(), e)))?;
    fs::remove_file(temp)
        .map_err(|e| RecorderError::IoFailure(format!("copied, but failed to remove temp file: {}", e)))?;

    log::info!("Copied recording to {}", dest.display());
    Ok(Relocation {
        path: dest.to_path_buf(),
        method: RelocationMethod::Copied,
    })
}

/// The final path for `dest` saved as `format`.
///
/// Replaces any existing extension. A non-native format is only a rename,
/// which is logged.
pub fn destination_for(dest: &Path, format: OutputFormat) -> PathBuf {
    if !format.is_native() {
        log::warn!(
            "saving as .{} without transcoding; the file content is still WAV",
            format.extension()
        );
    }
    dest.with_extension(format.extension())
}

/// Delete a temp recording. A file that is already gone is not an error.
pub fn discard(temp: &Path) -> Result<(), RecorderError> {
    match fs::remove_file(temp) {
        Ok(()) => {
            log::debug!("Discarded temp recording {}", temp.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RecorderError::IoFailure(format!(
            "failed to discard {}: {}",
            temp.display(),
            e
        ))),
    }
}
