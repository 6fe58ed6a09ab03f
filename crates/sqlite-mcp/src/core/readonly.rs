use crate::error::{AppError, AppResult};

/// Leading keywords that mark a statement as safe for a read-only call.
const READ_PREFIXES: [&str; 4] = ["SELECT", "PRAGMA", "EXPLAIN", "WITH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    ReadOnlySafe,
    Mutating,
}

/// Lexical prefix check only; the SQL is never parsed.
pub fn classify(sql: &str) -> StatementKind {
    let trimmed = sql.trim();
    let is_read = READ_PREFIXES.iter().any(|kw| {
        trimmed
            .get(..kw.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(kw))
    });
    if is_read {
        StatementKind::ReadOnlySafe
    } else {
        StatementKind::Mutating
    }
}

/// Rejects mutating statements when the caller asked for a read-only call.
pub fn enforce(sql: &str, readonly: bool) -> AppResult<StatementKind> {
    let kind = classify(sql);
    if readonly && kind == StatementKind::Mutating {
        return Err(AppError::WriteNotAllowed);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_prefixes() {
        for sql in [
            "SELECT 1",
            "  select * from t",
            "\n\tPragma table_info(t)",
            "explain query plan select 1",
            "WITH x AS (SELECT 1) SELECT * FROM x",
        ] {
            assert_eq!(classify(sql), StatementKind::ReadOnlySafe, "{sql}");
        }
    }

    #[test]
    fn test_mutating_statements() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "update t set a = 1",
            "DELETE FROM t",
            "CREATE TABLE t (a)",
            "DROP TABLE t",
            "",
            "   ",
            "-- comment\nSELECT 1",
            "(SELECT 1)",
        ] {
            assert_eq!(classify(sql), StatementKind::Mutating, "{sql:?}");
        }
    }

    #[test]
    fn test_prefix_is_lexical() {
        // No word boundary is required after the keyword.
        assert_eq!(classify("SELECTED"), StatementKind::ReadOnlySafe);
        assert_eq!(classify("WITHDRAW"), StatementKind::ReadOnlySafe);
    }

    #[test]
    fn test_multibyte_prefix_does_not_panic() {
        assert_eq!(classify("sélect 1"), StatementKind::Mutating);
        assert_eq!(classify("é"), StatementKind::Mutating);
    }

    #[test]
    fn test_enforce_readonly() {
        assert!(matches!(
            enforce("INSERT INTO t VALUES (1)", true),
            Err(AppError::WriteNotAllowed)
        ));
        assert_eq!(enforce("SELECT 1", true).unwrap(), StatementKind::ReadOnlySafe);
    }

    #[test]
    fn test_enforce_writable_never_rejects() {
        assert_eq!(
            enforce("DELETE FROM t", false).unwrap(),
            StatementKind::Mutating
        );
        assert_eq!(enforce("SELECT 1", false).unwrap(), StatementKind::ReadOnlySafe);
    }
}
