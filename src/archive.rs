//! Project bundles: a zip holding `manifest.json` plus every step screenshot
//! stored under its file name.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Read, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::recorder::types::{Annotation, AnnotationKind, Step};

pub const MANIFEST_NAME: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: String,
    steps: Vec<ManifestStep>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestStep {
    filename: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    alerts_above: Vec<ManifestAlert>,
    #[serde(default)]
    alerts_below: Vec<ManifestAlert>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestAlert {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

impl From<&Annotation> for ManifestAlert {
    fn from(a: &Annotation) -> Self {
        Self {
            kind: a.kind.label().to_string(),
            text: a.text.clone(),
        }
    }
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Io(std::io::Error::other(e.to_string()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write `steps` and their screenshots to a bundle at `path`.
///
/// Screenshots missing on disk are left out of the bundle; the manifest
/// still lists them.
pub fn save_project(steps: &[Step], path: &Path) -> Result<()> {
    let manifest = Manifest {
        version: MANIFEST_VERSION.to_string(),
        steps: steps
            .iter()
            .map(|step| ManifestStep {
                filename: file_name_of(&step.image_path),
                title: step.title.clone(),
                alerts_above: step.annotations_before.iter().map(Into::into).collect(),
                alerts_below: step.annotations_after.iter().map(Into::into).collect(),
            })
            .collect(),
    };

    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let buf: Vec<u8> = {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file(MANIFEST_NAME, opts).map_err(zip_error)?;
        zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        let mut written = HashSet::new();
        for (step, entry) in steps.iter().zip(&manifest.steps) {
            if entry.filename.is_empty() || !written.insert(entry.filename.as_str()) {
                continue;
            }
            let data = match fs::read(&step.image_path) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!(
                        "Leaving {} out of the project: {e}",
                        step.image_path.display()
                    );
                    continue;
                }
            };
            zip.start_file(entry.filename.as_str(), opts)
                .map_err(zip_error)?;
            zip.write_all(&data)?;
        }

        zip.finish().map_err(zip_error)?.into_inner()
    };

    // Write next to the target, then swap in.
    let tmp = path.with_extension("zip.part");
    fs::write(&tmp, buf)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    log::info!("Saved {} steps to {}", steps.len(), path.display());
    Ok(())
}

/// A plain file name with no directory parts.
fn is_basename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().map(|n| n == name).unwrap_or(false)
}

fn parse_kind(kind: &str, step: usize) -> Result<AnnotationKind> {
    kind.parse()
        .map_err(|e| Error::ArchiveCorrupt(format!("step {}: {e}", step + 1)))
}

fn convert_alerts(alerts: &[ManifestAlert], step: usize) -> Result<Vec<Annotation>> {
    alerts
        .iter()
        .map(|a| Ok(Annotation::new(parse_kind(&a.kind, step)?, a.text.clone())))
        .collect()
}

/// Read the bundle at `path`, extract its screenshots into `extract_to` and
/// return the steps in manifest order.
///
/// The whole manifest is validated against the bundle before anything is
/// written to `extract_to`.
pub fn load_project(path: &Path, extract_to: &Path) -> Result<Vec<Step>> {
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::ArchiveCorrupt(format!("not a project bundle: {e}")))?;

    let manifest: Manifest = {
        let mut entry = archive
            .by_name(MANIFEST_NAME)
            .map_err(|_| Error::ArchiveCorrupt(format!("{MANIFEST_NAME} is missing")))?;
        let mut raw = String::new();
        entry
            .read_to_string(&mut raw)
            .map_err(|e| Error::ArchiveCorrupt(format!("unreadable {MANIFEST_NAME}: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::ArchiveCorrupt(format!("invalid {MANIFEST_NAME}: {e}")))?
    };
    if manifest.version != MANIFEST_VERSION {
        log::warn!(
            "Project manifest version {} (expected {MANIFEST_VERSION})",
            manifest.version
        );
    }

    let present: HashSet<String> = archive.file_names().map(str::to_string).collect();
    let mut steps = Vec::with_capacity(manifest.steps.len());
    for (i, entry) in manifest.steps.iter().enumerate() {
        if !is_basename(&entry.filename) || entry.filename == MANIFEST_NAME {
            return Err(Error::ArchiveCorrupt(format!(
                "step {}: invalid file name \"{}\"",
                i + 1,
                entry.filename
            )));
        }
        if !present.contains(&entry.filename) {
            return Err(Error::ArchiveCorrupt(format!(
                "step {}: \"{}\" is not in the bundle",
                i + 1,
                entry.filename
            )));
        }
        let mut step = Step::new(i as u32, extract_to.join(&entry.filename), entry.title.clone());
        step.annotations_before = convert_alerts(&entry.alerts_above, i)?;
        step.annotations_after = convert_alerts(&entry.alerts_below, i)?;
        steps.push(step);
    }

    fs::create_dir_all(extract_to)?;
    let mut extracted: HashSet<&str> = HashSet::new();
    for entry in &manifest.steps {
        if !extracted.insert(entry.filename.as_str()) {
            continue;
        }
        let mut file = archive
            .by_name(&entry.filename)
            .map_err(|e| Error::ArchiveCorrupt(format!("{}: {e}", entry.filename)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::ArchiveCorrupt(format!("{}: {e}", entry.filename)))?;
        fs::write(extract_to.join(&entry.filename), data)?;
    }

    log::info!("Loaded {} steps from {}", steps.len(), path.display());
    Ok(steps)
}

/// Default bundle name used when none is given.
pub fn default_project_path() -> PathBuf {
    PathBuf::from("scribe_project.zip")
}
