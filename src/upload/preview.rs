use super::types::{FileHandle, PreviewRef};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registry of preview references handed out for upload items.
///
/// Every preview allocated on intake must be released when its item goes
/// away; `live()` makes leaks visible.
#[derive(Debug, Default)]
pub struct PreviewStore {
    next: u64,
    live: HashMap<PreviewRef, PathBuf>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, file: &FileHandle) -> PreviewRef {
        self.next += 1;
        let preview = PreviewRef(format!("preview://{}/{}", self.next, file.name));
        self.live.insert(preview.clone(), file.path.clone());
        debug!(preview = %preview.0, "allocated preview");
        preview
    }

    /// Returns false when the reference was already released.
    pub fn release(&mut self, preview: &PreviewRef) -> bool {
        let released = self.live.remove(preview).is_some();
        if released {
            debug!(preview = %preview.0, "released preview");
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        count
    }

    pub fn resolve(&self, preview: &PreviewRef) -> Option<&Path> {
        self.live.get(preview).map(PathBuf::as_path)
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> FileHandle {
        FileHandle {
            path: PathBuf::from(format!("/tmp/{name}")),
            name: name.to_string(),
            size: 1,
            media_type: "image/png".to_string(),
        }
    }

    #[test]
    fn same_file_name_gets_distinct_previews() {
        let mut store = PreviewStore::new();
        let a = store.allocate(&handle("ad.png"));
        let b = store.allocate(&handle("ad.png"));
        assert_ne!(a, b);
        assert_eq!(store.live(), 2);
        assert_eq!(store.resolve(&a), Some(Path::new("/tmp/ad.png")));
    }

    #[test]
    fn release_is_idempotent() {
        let mut store = PreviewStore::new();
        let a = store.allocate(&handle("ad.png"));
        assert!(store.release(&a));
        assert!(!store.release(&a));
        assert_eq!(store.live(), 0);
        assert!(store.resolve(&a).is_none());
    }
}
