//! Read the project `.env` into a key-value map (nothing is applied here; see `load_and_apply`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` in `override_dir` if given, else in the current directory.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Parses `.env` with the `dotenv` crate's line grammar (comments, quotes,
/// `export` prefix, `${VAR}` substitution). Missing file returns an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let iter = ::dotenv::from_path_iter(&path).map_err(|e| LoadError::Dotenv {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let mut out = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| LoadError::Dotenv {
            path: path.clone(),
            message: e.to_string(),
        })?;
        out.insert(key, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_file(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), content).unwrap();
        dir
    }

    #[test]
    fn missing_file_returns_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(Some(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn reads_keys_skipping_comments() {
        let dir = env_file("# gemini\nGEMINI_API_KEY=abc\n\nSTRATEGIST_LANGUAGE=English\n");
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("GEMINI_API_KEY").map(String::as_str), Some("abc"));
        assert_eq!(m.get("STRATEGIST_LANGUAGE").map(String::as_str), Some("English"));
    }

    #[test]
    fn quoted_values_are_unquoted() {
        let dir = env_file("A=\"Bahasa Indonesia\"\nB='single quoted'\n");
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("A").map(String::as_str), Some("Bahasa Indonesia"));
        assert_eq!(m.get("B").map(String::as_str), Some("single quoted"));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let dir = env_file("GOOD=1\nthis line has no equals sign\n");
        assert!(matches!(
            load_env_map(Some(dir.path())),
            Err(LoadError::Dotenv { .. })
        ));
    }
}
