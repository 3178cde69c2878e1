use super::error::IntakeError;
use super::types::FileHandle;
use ignore::Walk;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const IGNORED_FILES: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];

/// Builds a handle from a path on disk. The media type is guessed from the
/// extension and falls back to `application/octet-stream`.
pub fn handle_from_path(path: &Path) -> Result<FileHandle, IntakeError> {
    let metadata = fs::metadata(path).map_err(|source| IntakeError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(IntakeError::NotAFile(path.to_path_buf()));
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IntakeError::InvalidName(path.to_path_buf()))?
        .to_string();

    let media_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string();

    Ok(FileHandle {
        path: path.to_path_buf(),
        name,
        size: metadata.len(),
        media_type,
    })
}

/// Handles for picked or dropped paths, in the given order. Directories are
/// walked like [`collect_images`]; unreadable paths are logged and skipped.
pub fn handles_from_paths(paths: &[PathBuf]) -> Vec<FileHandle> {
    let mut handles = Vec::new();
    for path in paths {
        if path.is_dir() {
            handles.extend(collect_images(path));
            continue;
        }
        match handle_from_path(path) {
            Ok(handle) => handles.push(handle),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    handles
}

/// Walks a folder (honouring .gitignore and hidden-file rules) and returns
/// every file that looks like an image. Final acceptance is still up to the
/// upload policy.
pub fn collect_images(folder: &Path) -> Vec<FileHandle> {
    let mut handles = Vec::new();
    for entry in Walk::new(folder).flatten() {
        let path = entry.path();
        if !path.is_file() || is_ignored(path) {
            continue;
        }
        let looks_like_image = mime_guess::from_path(path)
            .first_raw()
            .is_some_and(|media_type| media_type.starts_with("image/"));
        if !looks_like_image {
            continue;
        }
        match handle_from_path(path) {
            Ok(handle) => handles.push(handle),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    handles.sort_by(|a, b| a.path.cmp(&b.path));
    handles
}

fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| IGNORED_FILES.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn handle_carries_size_and_guessed_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "banner.png", 2048);

        let handle = handle_from_path(&path).unwrap();
        assert_eq!(handle.name, "banner.png");
        assert_eq!(handle.size, 2048);
        assert_eq!(handle.media_type, "image/png");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "blob.zzzunknown", 4);
        assert_eq!(
            handle_from_path(&path).unwrap().media_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            handle_from_path(dir.path()),
            Err(IntakeError::NotAFile(_))
        ));
    }

    #[test]
    fn missing_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = write_file(dir.path(), "a.jpg", 1);
        let handles = handles_from_paths(&[present, dir.path().join("missing.jpg")]);
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn folder_walk_keeps_only_images() {
        let dir = tempfile::Builder::new()
            .prefix("creatives")
            .tempdir()
            .unwrap();
        write_file(dir.path(), "b.png", 1);
        write_file(dir.path(), "a.jpg", 1);
        write_file(dir.path(), "notes.txt", 1);
        write_file(dir.path(), "brief.pdf", 1);
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_file(&dir.path().join("nested"), "c.webp", 1);

        let names: Vec<_> = collect_images(dir.path())
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.webp"]);
    }

    #[test]
    fn dropped_folder_is_walked_alongside_files() {
        let dir = tempfile::Builder::new()
            .prefix("drop")
            .tempdir()
            .unwrap();
        let folder = dir.path().join("campaign");
        fs::create_dir(&folder).unwrap();
        write_file(&folder, "hero.png", 1);
        write_file(&folder, "copy.txt", 1);
        let loose = write_file(dir.path(), "banner.gif", 1);

        let names: Vec<_> = handles_from_paths(&[loose, folder])
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["banner.gif", "hero.png"]);
    }
}
