use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ReqtreeError, Result};

/// Extension of files that are parsed and expanded further.
pub const SCRIPT_EXTENSION: &str = "js";

static WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w").unwrap());

/// A reference that names a core/builtin module rather than a file.
/// Such references are never resolved against the filesystem.
pub fn is_core_reference(reference: &str) -> bool {
    WORD_START.is_match(reference)
}

pub fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

pub fn is_script(path: &Path) -> bool {
    extension_of(path) == SCRIPT_EXTENSION
}

/// Canonicalize an entry path; failure is an unreadable-file error.
pub fn canonicalize_entry(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| ReqtreeError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Resolve a file reference relative to `base_dir` the way the Node
/// loader does for relative specifiers: the exact path, then the path
/// with a script/json extension appended, then a directory index file.
pub fn resolve_module_path(base_dir: &Path, reference: &str) -> Result<PathBuf> {
    let joined = base_dir.join(reference);

    for candidate in lookup_candidates(&joined) {
        if candidate.is_file() {
            return canonicalize_entry(&candidate);
        }
    }

    Err(ReqtreeError::Resolve {
        reference: reference.to_string(),
        base: base_dir.to_path_buf(),
    })
}

fn lookup_candidates(joined: &Path) -> Vec<PathBuf> {
    vec![
        joined.to_path_buf(),
        append_extension(joined, ".js"),
        append_extension(joined, ".json"),
        joined.join("index.js"),
        joined.join("index.json"),
    ]
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut s = path.to_path_buf().into_os_string();
    s.push(extension);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_core_reference_classification() {
        assert!(is_core_reference("path"));
        assert!(is_core_reference("fs"));
        assert!(is_core_reference("_private"));
        assert!(is_core_reference("lodash/fp"));
        assert!(!is_core_reference("./a.js"));
        assert!(!is_core_reference("../lib"));
        assert!(!is_core_reference("/abs/file.js"));
    }

    #[test]
    fn test_resolution_lookup_order() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::write(base.join("a.js"), "").unwrap();
        fs::write(base.join("c.json"), "{}").unwrap();
        fs::create_dir(base.join("b")).unwrap();
        fs::write(base.join("b/index.js"), "").unwrap();

        let exact = resolve_module_path(base, "./a.js").unwrap();
        assert!(exact.ends_with("a.js"));

        let appended = resolve_module_path(base, "./a").unwrap();
        assert!(appended.ends_with("a.js"));

        let json = resolve_module_path(base, "./c").unwrap();
        assert!(json.ends_with("c.json"));

        let index = resolve_module_path(base, "./b").unwrap();
        assert!(index.ends_with("b/index.js"));
    }

    #[test]
    fn test_unresolvable_reference_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve_module_path(dir.path(), "./missing.js").unwrap_err();
        match err {
            ReqtreeError::Resolve { reference, .. } => assert_eq!(reference, "./missing.js"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extension_classification() {
        assert!(is_script(Path::new("/x/a.js")));
        assert!(!is_script(Path::new("/x/c.json")));
        assert!(!is_script(Path::new("/x/noext")));
    }
}
