use std::io::{Cursor, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage, RgbaImage};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

mod common;

use stepscribe::archive::{load_project, save_project};
use stepscribe::recorder::capture::{CaptureError, FrameSource, Surface};
use stepscribe::recorder::click_listener::{ClickHook, ClickSink};
use stepscribe::{Annotation, AnnotationKind, Error, Recorder, Settings, Step};

fn write_png(path: &Path, shade: u8) {
    RgbImage::from_pixel(32, 24, Rgb([shade, shade, shade]))
        .save(path)
        .unwrap();
}

fn sample_steps(dir: &Path) -> Vec<Step> {
    let mut steps = Vec::new();
    for i in 0..3u32 {
        let path = dir.join(format!("step_{i:03}.png"));
        write_png(&path, 40 * i as u8);
        steps.push(Step::new(i, path, format!("Step title {i}")));
    }
    steps[0]
        .annotations_before
        .push(Annotation::new(AnnotationKind::Warning, "Save first"));
    steps[0]
        .annotations_before
        .push(Annotation::new(AnnotationKind::Tip, "Ctrl+S works too"));
    steps[2]
        .annotations_after
        .push(Annotation::new(AnnotationKind::Alert, "Irreversible"));
    steps
}

fn bundle(manifest: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    zip.start_file("manifest.json", opts).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    for (name, data) in files {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn save_then_load_reproduces_steps() {
    let tmp = TempDir::new().unwrap();
    let steps = sample_steps(tmp.path());
    let project = tmp.path().join("guide.zip");
    save_project(&steps, &project).unwrap();

    let out = tmp.path().join("restored");
    let loaded = load_project(&project, &out).unwrap();

    assert_eq!(loaded.len(), steps.len());
    for (i, (orig, back)) in steps.iter().zip(&loaded).enumerate() {
        assert_eq!(back.index, i as u32);
        assert_eq!(back.title, orig.title);
        assert_eq!(back.annotations_before, orig.annotations_before);
        assert_eq!(back.annotations_after, orig.annotations_after);
        assert_eq!(back.image_path.parent(), Some(out.as_path()));
        assert_eq!(
            image::image_dimensions(&back.image_path).unwrap(),
            (32, 24)
        );
    }
}

#[test]
fn manifest_has_documented_shape() {
    let tmp = TempDir::new().unwrap();
    let steps = sample_steps(tmp.path());
    let project = tmp.path().join("guide.zip");
    save_project(&steps, &project).unwrap();

    let file = std::fs::File::open(&project).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let manifest: serde_json::Value =
        serde_json::from_reader(archive.by_name("manifest.json").unwrap()).unwrap();

    assert_eq!(manifest["version"], "1.0");
    assert_eq!(manifest["steps"][0]["filename"], "step_000.png");
    assert_eq!(manifest["steps"][0]["alerts_above"][0]["type"], "Warning");
    assert_eq!(manifest["steps"][0]["alerts_above"][1]["text"], "Ctrl+S works too");
    assert_eq!(manifest["steps"][2]["alerts_below"][0]["type"], "Alert");
    assert_eq!(archive.len(), 4);
}

#[test]
fn manifest_naming_a_missing_file_is_rejected_without_extracting() {
    let tmp = TempDir::new().unwrap();
    let manifest = r#"{
        "version": "1.0",
        "steps": [
            {"filename": "step_000.png", "title": "A", "alerts_above": [], "alerts_below": []},
            {"filename": "step_001.png", "title": "B", "alerts_above": [], "alerts_below": []}
        ]
    }"#;
    let project = tmp.path().join("broken.zip");
    std::fs::write(&project, bundle(manifest, &[("step_000.png", b"png")])).unwrap();

    let out = tmp.path().join("extract");
    let err = load_project(&project, &out).unwrap_err();
    assert!(matches!(err, Error::ArchiveCorrupt(ref m) if m.contains("step_001.png")));
    assert!(!out.exists());
}

#[test]
fn unknown_annotation_type_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let manifest = r#"{"version": "1.0", "steps": [
        {"filename": "a.png", "title": "A", "alerts_above": [{"type": "Shout", "text": "x"}]}
    ]}"#;
    let project = tmp.path().join("p.zip");
    std::fs::write(&project, bundle(manifest, &[("a.png", b"png")])).unwrap();
    assert!(matches!(
        load_project(&project, &tmp.path().join("x")),
        Err(Error::ArchiveCorrupt(_))
    ));
}

#[test]
fn path_like_filenames_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let manifest = r#"{"version": "1.0", "steps": [{"filename": "../evil.png", "title": ""}]}"#;
    let project = tmp.path().join("p.zip");
    std::fs::write(&project, bundle(manifest, &[("../evil.png", b"png")])).unwrap();
    let out = tmp.path().join("x");
    assert!(matches!(
        load_project(&project, &out),
        Err(Error::ArchiveCorrupt(_))
    ));
    assert!(!tmp.path().join("evil.png").exists());
}

#[test]
fn missing_manifest_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("step_000.png", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"png").unwrap();
    let project = tmp.path().join("p.zip");
    std::fs::write(&project, zip.finish().unwrap().into_inner()).unwrap();
    assert!(matches!(
        load_project(&project, &tmp.path().join("x")),
        Err(Error::ArchiveCorrupt(_))
    ));
}

#[test]
fn saving_skips_vanished_screenshots() {
    let tmp = TempDir::new().unwrap();
    let steps = sample_steps(tmp.path());
    std::fs::remove_file(&steps[1].image_path).unwrap();
    let project = tmp.path().join("guide.zip");
    save_project(&steps, &project).unwrap();

    let archive = zip::ZipArchive::new(std::fs::File::open(&project).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(!names.contains(&"step_001.png"));
    assert!(names.contains(&"step_000.png"));
    // The manifest still names it, so the bundle no longer loads.
    assert!(load_project(&project, &tmp.path().join("x")).is_err());
}

struct NoHook;

impl ClickHook for NoHook {
    fn install(&mut self, _sink: ClickSink) -> Result<(), String> {
        Err("not used".into())
    }

    fn uninstall(&mut self) {}
}

struct NoFrames;

impl FrameSource for NoFrames {
    fn surfaces(&self) -> Result<Vec<Surface>, CaptureError> {
        Err(CaptureError::NoSurfaces)
    }

    fn capture(&self, _surface: &Surface) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::NoSurfaces)
    }
}

fn recorder(root: PathBuf) -> Recorder {
    Recorder::with_backends(Settings::default(), Box::new(NoHook), Arc::new(NoFrames), root)
}

#[test]
fn failed_load_leaves_recorder_steps_untouched() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("good.zip");
    save_project(&sample_steps(tmp.path()), &good).unwrap();
    let bad = tmp.path().join("bad.zip");
    let manifest = r#"{"version": "1.0", "steps": [{"filename": "gone.png", "title": "X"}]}"#;
    std::fs::write(&bad, bundle(manifest, &[])).unwrap();

    let mut rec = recorder(tmp.path().join("cache"));
    assert_eq!(rec.load_project(&good).unwrap(), 3);
    let before = rec.steps();
    let dir = rec.session_dir().unwrap().to_path_buf();

    assert!(matches!(rec.load_project(&bad), Err(Error::ArchiveCorrupt(_))));
    assert_eq!(rec.steps(), before);
    assert_eq!(rec.session_dir(), Some(dir.as_path()));
    assert!(before.iter().all(|s| s.image_path.exists()));
}

#[test]
fn loaded_project_exports_to_pdf() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("guide.zip");
    save_project(&sample_steps(tmp.path()), &project).unwrap();

    let mut rec = recorder(tmp.path().join("cache"));
    rec.load_project(&project).unwrap();
    let out = tmp.path().join("guide.pdf");
    let pages = rec.export_pdf(&out, "Guide").unwrap();

    assert_eq!(pages, 2);
    let pages = common::page_text(&std::fs::read(&out).unwrap());
    assert_eq!(pages.len(), 2);
    assert!(pages.concat().iter().any(|t| t == "Warning: Save first"));
}
