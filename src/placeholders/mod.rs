//! Positional placeholder handling.
//!
//! The builder always emits bare `?` placeholders. This module counts them (to check the
//! parameter list before a statement is sent) and rewrites them for backends that expect
//! numbered placeholders. Quoted literals, comments and dollar-quoted bodies are skipped by a
//! small lexical state machine.

use std::borrow::Cow;

mod scanner;

use scanner::placeholder_offsets;

/// Placeholder syntax expected by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Bare `?` (SQLite, MySQL). Statements pass through untouched.
    Positional,
    /// Numbered `$1, $2, ...` (PostgreSQL).
    Numbered,
}

/// Number of `?` placeholders outside literals and comments.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    placeholder_offsets(sql).len()
}

/// Rewrite bare `?` placeholders into `target` style.
///
/// Returns a borrowed `Cow` when nothing changes.
#[must_use]
pub fn rewrite_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    if target == PlaceholderStyle::Positional {
        return Cow::Borrowed(sql);
    }

    let offsets = placeholder_offsets(sql);
    if offsets.is_empty() {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + offsets.len() * 2);
    let mut last = 0;
    for (n, offset) in offsets.iter().enumerate() {
        out.push_str(&sql[last..*offset]);
        out.push('$');
        out.push_str(&(n + 1).to_string());
        last = offset + 1;
    }
    out.push_str(&sql[last..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bare_placeholders() {
        assert_eq!(count_placeholders("UPDATE users SET a = ?, b = ? WHERE id = ?"), 3);
        assert_eq!(count_placeholders("SELECT id FROM users"), 0);
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"?\" -- ?\n/* ? /* ? */ */ from t where a = ?";
        assert_eq!(count_placeholders(sql), 1);
    }

    #[test]
    fn numbers_placeholders_for_postgres() {
        let sql = "INSERT INTO users (email,pass) VALUES(?,?)";
        let res = rewrite_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "INSERT INTO users (email,pass) VALUES($1,$2)");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$body$ select ? $body$ where a = ?";
        let res = rewrite_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "$body$ select ? $body$ where a = $1");
    }

    #[test]
    fn positional_target_borrows() {
        let sql = "select * from t where a = ?";
        let res = rewrite_placeholders(sql, PlaceholderStyle::Positional);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }
}
