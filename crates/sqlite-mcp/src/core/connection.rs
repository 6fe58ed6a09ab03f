use std::{path::Path, time::Duration};

use rusqlite::{Connection, OpenFlags};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn from_readonly(readonly: bool) -> Self {
        if readonly {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub busy_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(2_000),
        }
    }
}

/// Opens an existing database file strictly read-only.
pub fn open_for_read(path: &Path, opts: &ConnectOptions) -> AppResult<Connection> {
    if !path.is_file() {
        return Err(AppError::NotFound(path.to_path_buf()));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    open_conn(path, flags, opts)
}

/// Opens read-write, creating the file if it does not exist.
pub fn open_for_write(path: &Path, opts: &ConnectOptions) -> AppResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    open_conn(path, flags, opts)
}

/// Runs `f` on a connection that lives only for this call.
///
/// The connection is closed before returning, whether `f` succeeded or not.
/// A panic inside `f` still releases it through `Drop`.
pub fn with_connection<T>(
    path: &Path,
    mode: OpenMode,
    opts: &ConnectOptions,
    f: impl FnOnce(&Connection) -> AppResult<T>,
) -> AppResult<T> {
    let conn = match mode {
        OpenMode::ReadOnly => open_for_read(path, opts)?,
        OpenMode::ReadWrite => open_for_write(path, opts)?,
    };
    tracing::debug!(path = %path.display(), ?mode, "opened connection");

    let out = f(&conn);

    if let Err((_conn, e)) = conn.close() {
        tracing::warn!(error = %e, path = %path.display(), "failed to close connection cleanly");
    }
    out
}

fn open_conn(path: &Path, flags: OpenFlags, opts: &ConnectOptions) -> AppResult<Connection> {
    let conn = Connection::open_with_flags(path, flags).map_err(|source| AppError::DbOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    conn.busy_timeout(opts.busy_timeout)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_for_read_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let err = open_for_read(&path, &ConnectOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(p) if p == path));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_for_read_rejects_directory() {
        let dir = tempdir().unwrap();
        let err = open_for_read(dir.path(), &ConnectOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_open_for_write_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.db");
        let conn = open_for_write(&path, &ConnectOptions::default()).unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER)").unwrap();
        drop(conn);
        assert!(path.exists());
    }

    #[test]
    fn test_read_only_connection_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.db");
        open_for_write(&path, &ConnectOptions::default())
            .unwrap()
            .execute_batch("CREATE TABLE t (a INTEGER)")
            .unwrap();

        let conn = open_for_read(&path, &ConnectOptions::default()).unwrap();
        let res = conn.execute("INSERT INTO t VALUES (1)", []);
        assert!(res.is_err());
    }

    #[test]
    fn test_with_connection_returns_closure_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scoped.db");
        let n: i64 = with_connection(&path, OpenMode::ReadWrite, &ConnectOptions::default(), |c| {
            Ok(c.query_row("SELECT 41 + 1", [], |r| r.get(0))?)
        })
        .unwrap();
        assert_eq!(n, 42);
    }

    #[test]
    fn test_with_connection_propagates_closure_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scoped.db");
        let res: AppResult<()> =
            with_connection(&path, OpenMode::ReadWrite, &ConnectOptions::default(), |_| {
                Err(AppError::WriteNotAllowed)
            });
        assert!(matches!(res, Err(AppError::WriteNotAllowed)));

        // The handle was released: an exclusive transaction can be taken right away.
        let conn = open_for_write(&path, &ConnectOptions::default()).unwrap();
        conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;").unwrap();
    }
}
