pub mod helpers;
pub mod layout;
pub mod pdf;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::recorder::types::Step;
use layout::{paginate, FsProbe, PageGeometry};

/// File name used when the document title gives nothing to slug.
pub const FALLBACK_FILE_NAME: &str = "scribe_export.pdf";

/// Turn an IO error into a user-friendly message.
pub(crate) fn friendly_write_error(e: &std::io::Error, path: &Path) -> String {
    let path = path.display();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            format!("Cannot save to \"{path}\": permission denied. Is the file open in another app or the folder read-only?")
        }
        std::io::ErrorKind::NotFound => {
            format!("The folder for \"{path}\" does not exist.")
        }
        _ if e.raw_os_error() == Some(28) /* ENOSPC */ => {
            "Not enough disk space to save the file.".to_string()
        }
        _ => format!("Could not save file: {e}"),
    }
}

/// Pre-validate that we can write to `output_path` before doing expensive work.
///
/// Checks: parent dir writable (tempfile probe), existing file writable,
/// sufficient disk space.
fn validate_write_access(output_path: &Path, estimated_bytes: u64) -> std::result::Result<(), String> {
    let parent = match output_path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(format!("Invalid output path: \"{}\"", output_path.display())),
    };

    if !parent.exists() {
        return Err(format!(
            "The folder \"{}\" does not exist.",
            parent.display()
        ));
    }

    // Probe writability: create a temp file in the same directory
    let probe_path = parent.join(format!(".stepscribe_probe_{}", std::process::id()));
    match std::fs::File::create(&probe_path) {
        Ok(_) => { let _ = std::fs::remove_file(&probe_path); }
        Err(e) => {
            let _ = std::fs::remove_file(&probe_path);
            return Err(match e.kind() {
                std::io::ErrorKind::PermissionDenied => format!(
                    "Cannot write to folder \"{}\": permission denied.",
                    parent.display()
                ),
                _ => format!("Cannot write to folder \"{}\": {e}", parent.display()),
            });
        }
    }

    // If target file exists, verify it is writable (opens without truncating)
    if output_path.exists() {
        if let Err(e) = std::fs::OpenOptions::new().write(true).open(output_path) {
            return Err(match e.kind() {
                std::io::ErrorKind::PermissionDenied => format!(
                    "Cannot overwrite \"{}\": the file is read-only or locked.",
                    output_path.display()
                ),
                _ => format!("Cannot write to \"{}\": {e}", output_path.display()),
            });
        }
    }

    if let Ok(avail) = available_disk_space(parent) {
        const MIN_BUFFER: u64 = 10 * 1024 * 1024; // 10 MB safety margin
        let needed = estimated_bytes + MIN_BUFFER;
        if avail < needed {
            let need_mb = needed / (1024 * 1024);
            let have_mb = avail / (1024 * 1024);
            return Err(format!(
                "Not enough disk space. Need ~{need_mb} MB, but only {have_mb} MB available."
            ));
        }
    }

    Ok(())
}

/// Returns available disk space in bytes for the filesystem containing `path`.
#[cfg(unix)]
fn available_disk_space(path: &Path) -> std::io::Result<u64> {
    use std::os::unix::ffi::OsStrExt;
    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    #[allow(clippy::unnecessary_cast)]
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn available_disk_space(_path: &Path) -> std::io::Result<u64> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "disk space query not supported on this platform",
    ))
}

/// Default output location for a document titled `title`.
pub fn default_output_path(export_dir: &Path, title: &str) -> PathBuf {
    let slug = helpers::slugify_title(title);
    if slug.is_empty() {
        export_dir.join(FALLBACK_FILE_NAME)
    } else {
        export_dir.join(format!("{slug}.pdf"))
    }
}

/// Lay out `steps` and write them as a PDF to `output_path`.
///
/// Returns the number of pages written.
pub fn export_pdf(
    steps: &[Step],
    geometry: &PageGeometry,
    title: &str,
    output_path: &Path,
) -> Result<usize> {
    // Pre-validate before expensive work (~500KB per step estimate)
    let estimated_bytes = (steps.len() as u64) * 500_000 + 100_000;
    validate_write_access(output_path, estimated_bytes)
        .map_err(|reason| Error::write_failed(output_path, reason))?;

    let layout = paginate(steps, geometry, &FsProbe);
    pdf::write(&layout, geometry, title, output_path)?;

    let pages = layout.pages.len().max(1);
    log::info!(
        "Exported {} steps on {pages} pages to {}",
        steps.len(),
        output_path.display()
    );
    Ok(pages)
}
