//! Load configuration from the XDG `config.toml` and the project `.env`, then apply it
//! to the process environment with priority: **existing env > .env > XDG**.
//!
//! ```toml
//! # ~/.config/strategist/config.toml
//! [env]
//! GEMINI_API_KEY = "..."
//! STRATEGIST_LANGUAGE = "English"
//! STRATEGIST_TIMEOUT_SECS = 180
//! ```

mod env_file;
mod xdg_toml;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use xdg_toml::config_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("xdg config [env].{key}: expected a string, number or boolean, found {kind}")]
    XdgValue { key: String, kind: &'static str },
    #[error("read {}: {message}", path.display())]
    Dotenv { path: PathBuf, message: String },
}

/// Where an applied or skipped value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvSource {
    /// Already set in the process environment; left untouched.
    Process,
    DotEnv,
    Xdg,
}

/// Outcome of [`load_and_apply`]: the winning source per key seen in either file.
#[derive(Clone, Debug, Default)]
pub struct Applied {
    pub sources: BTreeMap<String, EnvSource>,
}

impl Applied {
    /// Keys that were written to the environment by this call.
    pub fn set_keys(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|(_, s)| **s != EnvSource::Process)
            .map(|(k, _)| k.as_str())
    }
}

/// Loads `$XDG_CONFIG_HOME/<app_name>/config.toml` and `.env`, then sets environment
/// variables only for keys that are **not** already set.
///
/// * `app_name`: e.g. `"strategist"`, used for the XDG path.
/// * `override_dir`: if `Some`, look for `.env` there instead of the current directory.
///
/// Values are never logged; callers may log the returned key names.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Applied, LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = env_file::load_env_map(override_dir)?;

    let mut applied = Applied::default();
    let keys = xdg_map.keys().chain(dotenv_map.keys());
    for key in keys {
        if applied.sources.contains_key(key) {
            continue;
        }
        if std::env::var_os(key).is_some() {
            applied.sources.insert(key.clone(), EnvSource::Process);
            continue;
        }
        let (value, source) = match dotenv_map.get(key) {
            Some(v) => (v, EnvSource::DotEnv),
            None => match xdg_map.get(key) {
                Some(v) => (v, EnvSource::Xdg),
                None => continue,
            },
        };
        std::env::set_var(key, value);
        applied.sources.insert(key.clone(), source);
    }
    Ok(applied)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Runs `f` with `XDG_CONFIG_HOME` pointing at `dir`, serialized with other env tests.
    pub(crate) fn with_xdg_home<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", dir);
        let out = f();
        match prev {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        out
    }

    fn xdg_with(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("strategist");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), content).unwrap();
        dir
    }

    fn dotenv_with(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), content).unwrap();
        dir
    }

    #[test]
    fn existing_env_wins() {
        let xdg = xdg_with("[env]\nCONFIG_TEST_EXISTING = \"from_xdg\"\n");
        let empty = tempfile::tempdir().unwrap();
        let applied = with_xdg_home(xdg.path(), || {
            env::set_var("CONFIG_TEST_EXISTING", "from_env");
            let applied = load_and_apply("strategist", Some(empty.path())).unwrap();
            assert_eq!(env::var("CONFIG_TEST_EXISTING").as_deref(), Ok("from_env"));
            env::remove_var("CONFIG_TEST_EXISTING");
            applied
        });
        assert_eq!(
            applied.sources.get("CONFIG_TEST_EXISTING"),
            Some(&EnvSource::Process)
        );
        assert_eq!(applied.set_keys().count(), 0);
    }

    #[test]
    fn no_config_is_ok() {
        let xdg = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let applied =
            with_xdg_home(xdg.path(), || load_and_apply("strategist", Some(empty.path()))).unwrap();
        assert!(applied.sources.is_empty());
    }

    #[test]
    fn dotenv_overrides_xdg() {
        let xdg = xdg_with("[env]\nCONFIG_TEST_PRIORITY = \"from_xdg\"\n");
        let dotenv = dotenv_with("CONFIG_TEST_PRIORITY=from_dotenv\n");
        let (val, applied) = with_xdg_home(xdg.path(), || {
            env::remove_var("CONFIG_TEST_PRIORITY");
            let applied = load_and_apply("strategist", Some(dotenv.path())).unwrap();
            let val = env::var("CONFIG_TEST_PRIORITY").unwrap();
            env::remove_var("CONFIG_TEST_PRIORITY");
            (val, applied)
        });
        assert_eq!(val, "from_dotenv");
        assert_eq!(
            applied.sources.get("CONFIG_TEST_PRIORITY"),
            Some(&EnvSource::DotEnv)
        );
    }

    #[test]
    fn xdg_applied_when_no_dotenv() {
        let xdg = xdg_with("[env]\nCONFIG_TEST_XDG_ONLY = \"from_xdg\"\n");
        let empty = tempfile::tempdir().unwrap();
        let val = with_xdg_home(xdg.path(), || {
            env::remove_var("CONFIG_TEST_XDG_ONLY");
            load_and_apply("strategist", Some(empty.path())).unwrap();
            let val = env::var("CONFIG_TEST_XDG_ONLY").unwrap();
            env::remove_var("CONFIG_TEST_XDG_ONLY");
            val
        });
        assert_eq!(val, "from_xdg");
    }

    #[test]
    fn invalid_xdg_toml_fails_with_xdg_parse_error() {
        let xdg = xdg_with("invalid [[[\n");
        let result = with_xdg_home(xdg.path(), || load_and_apply("strategist", None));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }

    #[test]
    fn config_path_is_under_app_dir() {
        let xdg = tempfile::tempdir().unwrap();
        let path = with_xdg_home(xdg.path(), || config_path("strategist")).unwrap();
        assert_eq!(path, xdg.path().join("strategist").join("config.toml"));
    }
}
