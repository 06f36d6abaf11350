//! Path normalization rules for the `Storage` contract.
//!
//! Backslashes become forward slashes; leading/trailing and duplicate
//! slashes collapse; `.` and the empty string are the root. Paths containing
//! a `..` segment, a NUL byte, or an ASCII control character outside
//! `{tab, newline, carriage-return}` are rejected, as are writes to the root.

use crate::errors::ConvergeError;

const ROOT: &str = "";

/// Normalize a path or reject it with `InvalidPath`.
pub fn normalize(raw: &str) -> Result<String, ConvergeError> {
    if let Some(bad) = raw.chars().find(|&c| is_rejected_control(c)) {
        return Err(ConvergeError::InvalidPath {
            path: raw.to_string(),
            reason: format!("contains rejected control character {:#x}", bad as u32),
        });
    }

    let slashed = raw.replace('\\', "/");
    let segments: Vec<&str> = slashed
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.iter().any(|s| *s == "..") {
        return Err(ConvergeError::InvalidPath {
            path: raw.to_string(),
            reason: "'..' segments are not allowed".to_string(),
        });
    }

    Ok(segments.join("/"))
}

/// Normalize a path and additionally reject the root (used by `write`, which
/// must target a concrete blob, never the root directory).
pub fn normalize_for_write(raw: &str) -> Result<String, ConvergeError> {
    let normalized = normalize(raw)?;
    if normalized == ROOT {
        return Err(ConvergeError::InvalidPath {
            path: raw.to_string(),
            reason: "writes to the root path are rejected".to_string(),
        });
    }
    Ok(normalized)
}

fn is_rejected_control(c: char) -> bool {
    if c == '\0' {
        return true;
    }
    let code = c as u32;
    (0x01..=0x1F).contains(&code) && c != '\t' && c != '\n' && c != '\r' || code == 0x7F
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_duplicate_and_leading_trailing_slashes() {
        assert_eq!(normalize("//a//b/").unwrap(), "a/b");
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize("a\\b\\c").unwrap(), "a/b/c");
    }

    #[test]
    fn dot_and_empty_are_root() {
        assert_eq!(normalize(".").unwrap(), "");
        assert_eq!(normalize("").unwrap(), "");
    }

    #[test]
    fn rejects_dotdot_segment() {
        assert!(normalize("../etc/passwd").is_err());
        assert!(normalize("a/../b").is_err());
    }

    #[test]
    fn rejects_nul_byte() {
        assert!(normalize("a\u{0}b").is_err());
    }

    #[test]
    fn allows_tab_newline_carriage_return() {
        assert!(normalize("a\tb\nc\rd").is_ok());
    }

    #[test]
    fn rejects_write_to_root() {
        assert!(normalize_for_write("").is_err());
        assert!(normalize_for_write(".").is_err());
        assert!(normalize_for_write("a").is_ok());
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-Z0-9/._\\\\-]{0,40}") {
            if let Ok(once) = normalize(&s) {
                let twice = normalize(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
