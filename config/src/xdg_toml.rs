//! Load the `[env]` table from `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set and absolute, else the platform config dir.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        if dir.is_absolute() {
            return Ok(dir);
        }
    }
    dirs::config_dir().ok_or_else(|| LoadError::XdgPath("no config directory for this user".into()))
}

/// Path of the app's config file, whether or not it exists.
pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    Ok(config_home()?.join(app_name).join("config.toml"))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, toml::Value>,
}

/// Env pairs from the `[env]` table. Missing file or section returns an empty map.
///
/// Non-string scalars (`STRATEGIST_TIMEOUT_SECS = 120`) are written as their TOML text.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let config: ConfigFile = toml::from_str(&content)?;
    config
        .env
        .into_iter()
        .map(|(key, value)| match value {
            toml::Value::String(s) => Ok((key, s)),
            toml::Value::Integer(_) | toml::Value::Float(_) | toml::Value::Boolean(_) => {
                Ok((key, value.to_string()))
            }
            other => Err(LoadError::XdgValue {
                key,
                kind: other.type_str(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::with_xdg_home;

    fn write_config(app: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), content).unwrap();
        dir
    }

    #[test]
    fn missing_config_returns_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = with_xdg_home(dir.path(), || load_env_map("strategist")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn reads_env_table_and_stringifies_scalars() {
        let dir = write_config(
            "strategist",
            "[env]\nGEMINI_API_KEY = \"from_toml\"\nSTRATEGIST_TIMEOUT_SECS = 120\nSTRATEGIST_TEMPERATURE = 0.4\n",
        );
        let map = with_xdg_home(dir.path(), || load_env_map("strategist")).unwrap();
        assert_eq!(map.get("GEMINI_API_KEY").map(String::as_str), Some("from_toml"));
        assert_eq!(map.get("STRATEGIST_TIMEOUT_SECS").map(String::as_str), Some("120"));
        assert_eq!(map.get("STRATEGIST_TEMPERATURE").map(String::as_str), Some("0.4"));
    }

    #[test]
    fn config_without_env_section_returns_empty_map() {
        let dir = write_config("strategist", "[other]\nkey = \"ignored\"\n");
        let map = with_xdg_home(dir.path(), || load_env_map("strategist")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn table_value_is_rejected() {
        let dir = write_config("strategist", "[env.NESTED]\nkey = 1\n");
        let result = with_xdg_home(dir.path(), || load_env_map("strategist"));
        assert!(matches!(result, Err(LoadError::XdgValue { ref key, .. }) if key == "NESTED"));
    }

    #[test]
    fn invalid_toml_returns_xdg_parse_error() {
        let dir = write_config("strategist", "not valid toml [[[\n");
        let result = with_xdg_home(dir.path(), || load_env_map("strategist"));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
