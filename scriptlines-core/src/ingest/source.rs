//! Script file discovery
//!
//! A collection is a folder of plain-text scripts, one per episode, named so
//! that the first two runs of digits give season and episode number
//! (`tng_s01e01.txt`, `dsn_s07e25.txt`).

use crate::error::Result;
use std::path::{Path, PathBuf};

/// A script file with the episode numbers taken from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub path: PathBuf,
    pub season: u32,
    pub number: u32,
}

impl ScriptFile {
    /// Returns `None` when the file name has fewer than two digit runs.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        let (season, number) = episode_numbers(&name)?;
        Some(Self {
            path: path.to_path_buf(),
            season,
            number,
        })
    }
}

/// First two digit runs of a file name.
pub fn episode_numbers(file_name: &str) -> Option<(u32, u32)> {
    let mut runs = file_name
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u32>().ok());

    let season = runs.next()??;
    let number = runs.next()??;
    Some((season, number))
}

/// Regular files in `folder` matching `pattern`, sorted by file name.
pub fn discover(folder: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = folder.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern_str)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable entry during discovery");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read a script, replacing invalid UTF-8 sequences instead of failing.
pub fn read_script(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), "Script is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_episode_numbers() {
        assert_eq!(episode_numbers("tng_s01e01.txt"), Some((1, 1)));
        assert_eq!(episode_numbers("dsn_s07e25.txt"), Some((7, 25)));
        assert_eq!(episode_numbers("03x14 extra 99.txt"), Some((3, 14)));
        assert_eq!(episode_numbers("pilot.txt"), None);
        assert_eq!(episode_numbers("season2.txt"), None);
    }

    #[test]
    fn test_script_file_from_path() {
        let file = ScriptFile::from_path(Path::new("/scripts/tng/tng_s02e09.txt")).unwrap();
        assert_eq!((file.season, file.number), (2, 9));
        assert!(ScriptFile::from_path(Path::new("/scripts/tng/README")).is_none());
    }

    #[test]
    fn test_discover_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        for name in ["tng_s01e10.txt", "tng_s01e02.txt", "tng_s01e01.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("drafts")).unwrap();

        let files = discover(dir.path(), "*").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["tng_s01e01.txt", "tng_s01e02.txt", "tng_s01e10.txt"]);
    }

    #[test]
    fn test_discover_respects_pattern() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tng_s01e01.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let files = discover(dir.path(), "*.txt").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_read_script_replaces_invalid_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, b"\t\t\t\t\tPICARD\n\t\t\tTea, Earl Grey\xff hot.\n").unwrap();

        let text = read_script(&path).unwrap();
        assert!(text.contains("Earl Grey\u{FFFD} hot."));
        assert!(text.starts_with("\t\t\t\t\tPICARD\n"));
    }
}
