use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use uuid::Uuid;

/// Shared state of one recording session.
///
/// Handed (behind an `Arc`) to both the click listener and the capture
/// worker; it replaces any process-wide recording flag or counter.
#[derive(Debug)]
pub struct Session {
    pub temp_dir: PathBuf,
    recording: AtomicBool,
    next_index: AtomicU32,
}

impl Session {
    /// Create a session under `<root>/sessions/<uuid>`.
    pub fn new(root: &Path) -> std::io::Result<Self> {
        let id = Uuid::new_v4().to_string();
        let temp_dir = root.join("sessions").join(&id);
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            temp_dir,
            recording: AtomicBool::new(false),
            next_index: AtomicU32::new(0),
        })
    }

    /// Default root for session directories.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("stepscribe")
    }

    /// Remove this session's directory and all screenshots.
    pub fn cleanup(&self) {
        if self.temp_dir.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.temp_dir) {
                log::warn!("Could not remove {}: {err}", self.temp_dir.display());
            }
        }
    }

    /// Remove every session directory left under `root` by earlier runs.
    pub fn cleanup_all_sessions(root: &Path) {
        let sessions_dir = root.join("sessions");
        if sessions_dir.is_dir() {
            let _ = std::fs::remove_dir_all(&sessions_dir);
        }
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Reserve the next sequence index.
    pub fn next_index(&self) -> u32 {
        self.next_index.fetch_add(1, Ordering::SeqCst)
    }

    pub fn screenshot_path(&self, index: u32) -> PathBuf {
        self.temp_dir.join(Self::screenshot_name(index))
    }

    pub fn screenshot_name(index: u32) -> String {
        format!("step_{index:03}.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn session_creates_temp_dir() {
        let root = tempdir().unwrap();
        let session = Session::new(root.path()).expect("create session");
        assert!(session.temp_dir.exists());
        assert!(session.temp_dir.starts_with(root.path().join("sessions")));
        session.cleanup();
        assert!(!session.temp_dir.exists());
    }

    #[test]
    fn session_hands_out_increasing_indices() {
        let root = tempdir().unwrap();
        let session = Session::new(root.path()).unwrap();
        assert_eq!(session.next_index(), 0);
        assert_eq!(session.next_index(), 1);
        assert_eq!(session.next_index(), 2);
    }

    #[test]
    fn screenshot_names_are_zero_padded() {
        assert_eq!(Session::screenshot_name(7), "step_007.png");
        assert_eq!(Session::screenshot_name(1234), "step_1234.png");
    }

    #[test]
    fn cleanup_all_sessions_removes_leftovers() {
        let root = tempdir().unwrap();
        let a = Session::new(root.path()).unwrap();
        let b = Session::new(root.path()).unwrap();
        Session::cleanup_all_sessions(root.path());
        assert!(!a.temp_dir.exists());
        assert!(!b.temp_dir.exists());
    }

    #[test]
    fn recording_flag_toggles() {
        let root = tempdir().unwrap();
        let session = Session::new(root.path()).unwrap();
        assert!(!session.is_recording());
        session.set_recording(true);
        assert!(session.is_recording());
    }
}
