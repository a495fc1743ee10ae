//! Typed access to the deployment `.env` file.
//!
//! The file is the source of truth for the database policy flag and the
//! connection parameters the stack containers read. It is a flat
//! `KEY=VALUE` file created by the operator; we only ever upsert single
//! lines and never reorder or delete what the operator wrote.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Values the original deployment treats as "true" for boolean keys.
const TRUTHY: [&str; 6] = ["1", "true", "yes", "on", "y", "t"];

/// Tri-state database policy read from `USE_DB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFlag {
    Enabled,
    Disabled,
    Unset,
}

/// Read `key` from the env file, returning an empty string when the file
/// or the key is missing. Lookup never fails the run.
pub fn get(path: &Path, key: &str) -> String {
    let Ok(content) = fs::read_to_string(path) else {
        return String::new();
    };
    for line in content.lines() {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        if k.trim() == key {
            return unquote(v.trim()).to_string();
        }
    }
    String::new()
}

/// Read `key` as a boolean; `None` when the key is missing or empty.
pub fn get_bool(path: &Path, key: &str) -> Option<bool> {
    let value = get(path, key);
    if value.is_empty() {
        return None;
    }
    Some(TRUTHY.contains(&value.to_ascii_lowercase().as_str()))
}

/// Read `key` as the tri-state policy flag.
pub fn policy_flag(path: &Path, key: &str) -> PolicyFlag {
    match get_bool(path, key) {
        Some(true) => PolicyFlag::Enabled,
        Some(false) => PolicyFlag::Disabled,
        None => PolicyFlag::Unset,
    }
}

/// Idempotent upsert: replace the existing `key=` line in place, or append
/// a new line. After a write the key appears exactly once.
pub fn set(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = fs::read_to_string(path).unwrap_or_default();
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;
    for line in content.lines() {
        let is_target = line
            .split_once('=')
            .is_some_and(|(k, _)| k.trim() == key);
        if is_target && !replaced {
            lines.push(format!("{key}={value}"));
            replaced = true;
        } else if is_target {
            // A pre-existing duplicate; collapse it.
            continue;
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(format!("{key}={value}"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    fs::write(path, out).with_context(|| format!("write env file {}", path.display()))?;
    Ok(())
}

/// Strip one layer of matching surrounding quotes. Trailing `\r` from
/// CRLF files is trimmed before the quotes are considered.
pub(crate) fn unquote(value: &str) -> &str {
    let value = value.trim_end_matches('\r').trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn env_path(dir: &TempDir) -> PathBuf {
        dir.path().join(".env")
    }

    #[test]
    fn get_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(get(&env_path(&dir), "USE_DB"), "");
        assert_eq!(get_bool(&env_path(&dir), "USE_DB"), None);
    }

    #[test]
    fn get_missing_key_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(&path, "DB_HOST=db\n").unwrap();
        assert_eq!(get(&path, "DB_USER"), "");
    }

    #[test]
    fn get_strips_quotes_whitespace_and_cr() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(
            &path,
            "DB_PASSWORD=\"s3cret\"\r\nDB_USER='bot'\nDB_HOST =  db  \n",
        )
        .unwrap();
        assert_eq!(get(&path, "DB_PASSWORD"), "s3cret");
        assert_eq!(get(&path, "DB_USER"), "bot");
        assert_eq!(get(&path, "DB_HOST"), "db");
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        set(&path, "USE_DB", "true").unwrap();
        assert_eq!(get(&path, "USE_DB"), "true");
        set(&path, "USE_DB", "false").unwrap();
        assert_eq!(get(&path, "USE_DB"), "false");

        let content = fs::read_to_string(&path).unwrap();
        let occurrences = content
            .lines()
            .filter(|l| l.starts_with("USE_DB="))
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn set_preserves_unrelated_lines() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(&path, "DB_HOST=db\nUSE_DB=false\nDB_NAME=bot\n").unwrap();
        set(&path, "USE_DB", "true").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "DB_HOST=db\nUSE_DB=true\nDB_NAME=bot\n");
    }

    #[test]
    fn set_appends_missing_key() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(&path, "DB_HOST=db\n").unwrap();
        set(&path, "MYSQL_ROOT_PASSWORD", "root-pw").unwrap();
        assert_eq!(get(&path, "MYSQL_ROOT_PASSWORD"), "root-pw");
        assert_eq!(get(&path, "DB_HOST"), "db");
    }

    #[test]
    fn truthy_forms_parse_as_enabled() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        for form in ["1", "true", "YES", "On", "y", "T"] {
            set(&path, "USE_DB", form).unwrap();
            assert_eq!(policy_flag(&path, "USE_DB"), PolicyFlag::Enabled, "{form}");
        }
        set(&path, "USE_DB", "0").unwrap();
        assert_eq!(policy_flag(&path, "USE_DB"), PolicyFlag::Disabled);
    }
}
