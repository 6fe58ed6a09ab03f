use std::path::Path;

use crate::core::types::DatabaseFileList;
use crate::error::{AppError, AppResult};

pub const DATABASE_EXTENSIONS: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

/// Immediate regular files in `directory` that look like SQLite databases,
/// sorted ascending. `directory` is expected to be absolute already.
pub fn list_databases(directory: &Path) -> AppResult<DatabaseFileList> {
    let entries = std::fs::read_dir(directory).map_err(|source| AppError::DirectoryUnreadable {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_db_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(has_database_extension);
        if is_db_name && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn has_database_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DATABASE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
