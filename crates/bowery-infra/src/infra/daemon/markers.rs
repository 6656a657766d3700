//! Crash-recovery marker files kept in the temp dir.
//!
//! `bowery_client_pid` holds the daemon's pid and `bowery_dir` the working
//! directory it was started from. Both are last-writer-wins. Every operation is
//! best-effort: failures are logged and never reach the caller.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

pub const PID_FILE: &str = "bowery_client_pid";
pub const DIR_FILE: &str = "bowery_dir";

#[derive(Debug, Clone)]
pub struct MarkerFiles {
    pid_path: PathBuf,
    dir_path: PathBuf,
}

impl MarkerFiles {
    pub fn new(temp_dir: &Path) -> Self {
        Self {
            pid_path: temp_dir.join(PID_FILE),
            dir_path: temp_dir.join(DIR_FILE),
        }
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    pub fn dir_path(&self) -> &Path {
        &self.dir_path
    }

    pub fn write(&self, pid: u32, working_dir: &Path) {
        write_best_effort(&self.pid_path, &pid.to_string());
        write_best_effort(&self.dir_path, &working_dir.to_string_lossy());
    }

    pub fn read_pid(&self) -> Option<u32> {
        let raw = read_best_effort(&self.pid_path)?;
        match raw.trim().parse() {
            Ok(pid) => Some(pid),
            Err(_) => {
                warn!(path = %self.pid_path.display(), content = %raw.trim(), "Ignoring unparseable pid marker");
                None
            }
        }
    }

    pub fn read_dir(&self) -> Option<PathBuf> {
        read_best_effort(&self.dir_path)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    }

    pub fn clear(&self) {
        remove_best_effort(&self.pid_path);
        remove_best_effort(&self.dir_path);
    }
}

fn write_best_effort(path: &Path, content: &str) {
    if let Err(err) = fs::write(path, content) {
        warn!(path = %path.display(), error = %err, "Failed to write marker file");
    }
}

fn read_best_effort(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to read marker file");
            None
        }
    }
}

fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed marker file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "Failed to remove marker file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let markers = MarkerFiles::new(dir.path());

        markers.write(4242, Path::new("/srv/app"));

        assert_eq!(markers.read_pid(), Some(4242));
        assert_eq!(markers.read_dir(), Some(PathBuf::from("/srv/app")));
        assert_eq!(
            fs::read_to_string(dir.path().join(PID_FILE)).unwrap(),
            "4242"
        );
    }

    #[test]
    fn test_missing_markers_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let markers = MarkerFiles::new(dir.path());

        assert_eq!(markers.read_pid(), None);
        assert_eq!(markers.read_dir(), None);
        markers.clear();
    }

    #[test]
    fn test_garbage_pid_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PID_FILE), "not-a-pid").unwrap();

        assert_eq!(MarkerFiles::new(dir.path()).read_pid(), None);
    }

    #[test]
    fn test_clear_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let markers = MarkerFiles::new(dir.path());
        markers.write(1, Path::new("/tmp"));

        markers.clear();

        assert!(!markers.pid_path().exists());
        assert!(!markers.dir_path().exists());
    }

    #[test]
    fn test_write_into_missing_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let markers = MarkerFiles::new(&dir.path().join("gone"));

        markers.write(7, Path::new("/tmp"));

        assert_eq!(markers.read_pid(), None);
    }
}
