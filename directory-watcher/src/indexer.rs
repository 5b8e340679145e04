//! Document identities and the directory listing they are diffed from.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::NameMatcher;
use crate::error::{Result, WatcherError};
use crate::event::WatchEvent;

/// The stable key of one document across edits.
///
/// Equality, hashing and ordering use `base` only, so `post.md` and
/// `post.markdown` are the same document. Two genuinely different files
/// sharing a base name collide: the index keeps whichever it saw last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIdentity {
    base: String,
    ext: String,
    path: PathBuf,
}

impl DocumentIdentity {
    /// Resolve a file name inside `dir` into an identity.
    ///
    /// The name is split on its final `.`; a name without one gets an empty
    /// extension.
    pub fn resolve(dir: &Path, file_name: &str) -> Self {
        let (base, ext) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
        Self {
            base: base.to_string(),
            ext: ext.to_string(),
            path: dir.join(file_name),
        }
    }

    /// Resolve a full path, using its parent as the directory.
    ///
    /// Returns `None` for paths without a UTF-8 file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::resolve(dir, name))
    }

    /// File name without its final extension.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Extension without the separator.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full file name, `base.ext`.
    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.base.clone()
        } else {
            format!("{}.{}", self.base, self.ext)
        }
    }
}

impl PartialEq for DocumentIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl Eq for DocumentIdentity {}

impl Hash for DocumentIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
    }
}

impl PartialOrd for DocumentIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.base.cmp(&other.base)
    }
}

impl std::fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// The set of identities found in one directory listing.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    /// Identities by base name.
    entries: BTreeMap<String, DocumentIdentity>,
}

impl FileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// List the regular files directly inside `dir` that match `matcher`.
    pub fn scan(dir: &Path, matcher: &NameMatcher) -> Result<Self> {
        if !dir.exists() {
            return Err(WatcherError::DirectoryNotFound(dir.display().to_string()));
        }
        if !dir.is_dir() {
            return Err(WatcherError::NotADirectory(dir.display().to_string()));
        }

        let mut index = Self::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            if !(entry.file_type().is_file() || entry.path().is_file()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !matcher.matches(name) {
                continue;
            }

            let identity = DocumentIdentity::resolve(dir, name);
            if let Some(previous) = index.insert(identity) {
                warn!(
                    "{name} shares its base name with {}; {name} replaces it",
                    previous.file_name()
                );
            }
        }

        debug!("Scanned {}: {} documents", dir.display(), index.len());
        Ok(index)
    }

    /// Insert an identity, returning the one it replaced.
    pub fn insert(&mut self, identity: DocumentIdentity) -> Option<DocumentIdentity> {
        self.entries.insert(identity.base.clone(), identity)
    }

    /// Remove an identity by base name.
    pub fn remove(&mut self, base: &str) -> Option<DocumentIdentity> {
        self.entries.remove(base)
    }

    /// Get an identity by base name.
    pub fn get(&self, base: &str) -> Option<&DocumentIdentity> {
        self.entries.get(base)
    }

    /// Check whether a base name is known.
    pub fn contains(&self, base: &str) -> bool {
        self.entries.contains_key(base)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over identities ordered by base name.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentIdentity> {
        self.entries.values()
    }

    /// One `Created` event per identity, ordered by base name.
    pub fn created_events(&self) -> Vec<WatchEvent> {
        self.iter().cloned().map(WatchEvent::Created).collect()
    }

    /// Diff two listings into ordered events.
    ///
    /// `touched` holds the base names that saw raw notifications since the
    /// previous listing. Created events come first, then removed, then
    /// changed; a created identity is never also reported as changed.
    pub fn diff(
        previous: &FileIndex,
        current: &FileIndex,
        touched: &BTreeSet<String>,
    ) -> Vec<WatchEvent> {
        let created = current
            .iter()
            .filter(|identity| !previous.contains(&identity.base))
            .cloned()
            .map(WatchEvent::Created);

        let removed = previous
            .iter()
            .filter(|identity| !current.contains(&identity.base))
            .cloned()
            .map(WatchEvent::Removed);

        let changed = touched
            .iter()
            .filter(|base| previous.contains(base))
            .filter_map(|base| current.get(base))
            .cloned()
            .map(WatchEvent::Changed);

        created.chain(removed).chain(changed).collect()
    }
}

impl FromIterator<DocumentIdentity> for FileIndex {
    fn from_iter<I: IntoIterator<Item = DocumentIdentity>>(iter: I) -> Self {
        let mut index = Self::new();
        for identity in iter {
            index.insert(identity);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn index_of(dir: &Path, names: &[&str]) -> FileIndex {
        names
            .iter()
            .map(|name| DocumentIdentity::resolve(dir, name))
            .collect()
    }

    fn touched(bases: &[&str]) -> BTreeSet<String> {
        bases.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn test_resolve_splits_on_final_dot() {
        let identity = DocumentIdentity::resolve(Path::new("/blog"), "2024-01-01-hello.md");

        assert_eq!(identity.base(), "2024-01-01-hello");
        assert_eq!(identity.ext(), "md");
        assert_eq!(identity.path(), Path::new("/blog/2024-01-01-hello.md"));
        assert_eq!(identity.file_name(), "2024-01-01-hello.md");
    }

    #[test]
    fn test_resolve_keeps_inner_dots_in_base() {
        let identity = DocumentIdentity::resolve(Path::new("/blog"), "v1.2.notes.md");
        assert_eq!(identity.base(), "v1.2.notes");
        assert_eq!(identity.ext(), "md");
    }

    #[test]
    fn test_resolve_without_extension() {
        let identity = DocumentIdentity::resolve(Path::new("/blog"), "README");
        assert_eq!(identity.base(), "README");
        assert_eq!(identity.ext(), "");
        assert_eq!(identity.to_string(), "README");
    }

    #[test]
    fn test_identity_equality_uses_base_only() {
        let dir = Path::new("/blog");
        let md = DocumentIdentity::resolve(dir, "post.md");
        let markdown = DocumentIdentity::resolve(dir, "post.markdown");
        let other = DocumentIdentity::resolve(dir, "posts.md");

        assert_eq!(md, markdown);
        assert_ne!(md.ext(), markdown.ext());
        assert_ne!(md, other);
    }

    #[test]
    fn test_diff_created_removed_changed() {
        let dir = Path::new("/blog");
        let previous = index_of(dir, &["a.md", "b.md", "c.md"]);
        let current = index_of(dir, &["b.md", "c.md", "d.md"]);

        let events = FileIndex::diff(&previous, &current, &touched(&["b"]));

        assert_eq!(
            events,
            vec![
                WatchEvent::Created(DocumentIdentity::resolve(dir, "d.md")),
                WatchEvent::Removed(DocumentIdentity::resolve(dir, "a.md")),
                WatchEvent::Changed(DocumentIdentity::resolve(dir, "b.md")),
            ]
        );
    }

    #[test]
    fn test_diff_never_reports_created_as_changed() {
        let dir = Path::new("/blog");
        let previous = index_of(dir, &["a.md"]);
        let current = index_of(dir, &["a.md", "new.md"]);

        let events = FileIndex::diff(&previous, &current, &touched(&["new"]));

        assert_eq!(
            events,
            vec![WatchEvent::Created(DocumentIdentity::resolve(dir, "new.md"))]
        );
    }

    #[test]
    fn test_diff_ignores_touched_identities_that_vanished() {
        let dir = Path::new("/blog");
        let previous = index_of(dir, &["a.md", "b.md"]);
        let current = index_of(dir, &["b.md"]);

        let events = FileIndex::diff(&previous, &current, &touched(&["a", "ghost"]));

        assert_eq!(
            events,
            vec![WatchEvent::Removed(DocumentIdentity::resolve(dir, "a.md"))]
        );
    }

    #[test]
    fn test_diff_extension_swap_is_a_change() {
        let dir = Path::new("/blog");
        let previous = index_of(dir, &["post.md"]);
        let current = index_of(dir, &["post.markdown"]);

        let events = FileIndex::diff(&previous, &current, &touched(&["post"]));

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], WatchEvent::Changed(id) if id.ext() == "markdown"));
    }

    #[test]
    fn test_scan_filters_by_matcher() {
        let temp_dir = TempDir::new().unwrap();

        let mut f1 = File::create(temp_dir.path().join("hello.md")).unwrap();
        writeln!(f1, "Hello").unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();
        File::create(temp_dir.path().join("README")).unwrap();
        std::fs::create_dir(temp_dir.path().join("nested.md")).unwrap();

        let index = FileIndex::scan(temp_dir.path(), &NameMatcher::default()).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.contains("hello"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = FileIndex::scan(Path::new("/nonexistent/path/12345"), &NameMatcher::default());
        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_scan_base_collision_keeps_one() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("post.md")).unwrap();
        File::create(temp_dir.path().join("post.txt")).unwrap();

        let matcher = NameMatcher::new(&["md".to_string(), "txt".to_string()], None).unwrap();
        let index = FileIndex::scan(temp_dir.path(), &matcher).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("post").map(DocumentIdentity::ext), Some("txt"));
    }
}
