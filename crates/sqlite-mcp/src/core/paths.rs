use std::path::{Component, Path, PathBuf};

use crate::error::AppResult;

/// Makes a caller-supplied path absolute against the current directory.
pub fn resolve(raw: &Path) -> AppResult<PathBuf> {
    let abs = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        std::env::current_dir()?.join(raw)
    };
    Ok(normalize_lexical(&abs))
}

/// Removes `.` and resolves `..` without touching the filesystem, so it works
/// for database files that do not exist yet.
fn normalize_lexical(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op.
                out.pop();
            }
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(comp.as_os_str()),
            Component::Normal(c) => out.push(c),
        }
    }

    out
}
