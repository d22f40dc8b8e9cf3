use crate::config::schema::Config;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads configuration: defaults < config file < environment < CLI flags
pub fn load_config(
    cli_model: Option<String>,
    cli_language: Option<String>,
    cli_config_path: Option<PathBuf>,
) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file (~/.voicetutor/config.json or --config)
    let config_file = cli_config_path.or_else(get_default_config_path);

    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = merge_config_from_file(config, path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment variables
    config = merge_env_variables(config);

    // Layer 3: CLI flags
    if let Some(model) = cli_model {
        tracing::debug!(model = %model, "Applying CLI model override");
        config.gemini.default_model = model;
    }
    if let Some(language) = cli_language {
        tracing::debug!(language = %language, "Applying CLI language override");
        config.default_language = language;
    }

    let summary = config.get_safe_summary();
    tracing::debug!(
        gemini_key_configured = summary.gemini_key_configured,
        speech_key_configured = summary.speech_key_configured,
        model = %summary.model,
        lessons_dir = %summary.lessons_dir.display(),
        prompts_file_configured = summary.prompts_file_configured,
        default_language = %summary.default_language,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".voicetutor").join("config.json"))
}

/// Config files hold API keys; anything readable beyond the owner is skipped
#[cfg(unix)]
fn has_private_permissions(path: &Path, metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 {
        tracing::error!(
            "Config file {:?} has permissions {:o}, expected 0600 - skipping for security",
            path,
            mode
        );
        return false;
    }
    true
}

#[cfg(not(unix))]
fn has_private_permissions(_path: &Path, _metadata: &fs::Metadata) -> bool {
    true
}

fn merge_config_from_file(config: Config, path: &Path) -> Result<Config> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
        Err(e) => return Err(e).context("Failed to read metadata for config file"),
    };

    if !has_private_permissions(path, &metadata) {
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    // Missing fields take their serde defaults
    let file_config: Config = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;

    Ok(file_config)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn merge_env_variables(mut config: Config) -> Config {
    if let Some(key) = env_value("GEMINI_API_KEY") {
        tracing::debug!("Using GEMINI_API_KEY from environment");
        config.gemini.api_key = key;
    }
    if let Some(key) = env_value("GOOGLE_API_KEY") {
        tracing::debug!("Using GOOGLE_API_KEY from environment");
        config.speech.api_key = key;
    }
    if let Some(dir) = env_value("VOICETUTOR_LESSONS_DIR") {
        config.lessons_dir = PathBuf::from(dir);
    }
    if let Some(file) = env_value("VOICETUTOR_PROMPTS_FILE") {
        config.prompts_file = Some(PathBuf::from(file));
    }
    if let Some(language) = env_value("VOICETUTOR_LANGUAGE") {
        config.default_language = language;
    }
    config
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(config)?;

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create config file: {:?}", path))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    // Owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = file.metadata()?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on config file: {:?}", path))?;
    }

    tracing::info!("Configuration saved to {:?}", path);
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    get_default_config_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 5] = [
        "GEMINI_API_KEY",
        "GOOGLE_API_KEY",
        "VOICETUTOR_LESSONS_DIR",
        "VOICETUTOR_PROMPTS_FILE",
        "VOICETUTOR_LANGUAGE",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_load_config_defaults() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();

        let config = load_config(None, None, Some(temp_dir.path().join("missing.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut file_config = Config::default();
        file_config.gemini.api_key = "file-gemini".to_string();
        file_config.speech.api_key = "file-speech".to_string();
        file_config.lessons_dir = PathBuf::from("/srv/lessons");
        save_config(&file_config, &config_path).unwrap();

        let loaded = load_config(None, None, Some(config_path)).unwrap();
        assert_eq!(loaded, file_config);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_config_sets_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");
        save_config(&Config::default(), &config_path).unwrap();

        let mode = fs::metadata(&config_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_world_readable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, r#"{ "gemini": { "api_key": "leaky" } }"#).unwrap();
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();

        let config = load_config(None, None, Some(config_path)).unwrap();
        assert!(!config.gemini.has_api_key());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_config_invalid_json() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, "not valid json").unwrap();
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600)).unwrap();

        let result = load_config(None, None, Some(config_path));
        let err_msg = format!("{}", result.unwrap_err());
        assert!(err_msg.contains("invalid JSON"));
    }

    #[test]
    fn test_env_variable_override() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut file_config = Config::default();
        file_config.gemini.api_key = "file-gemini".to_string();
        save_config(&file_config, &config_path).unwrap();

        unsafe {
            env::set_var("GEMINI_API_KEY", "env-gemini");
            env::set_var("GOOGLE_API_KEY", "env-speech");
            env::set_var("VOICETUTOR_LESSONS_DIR", "/data/lessons");
            env::set_var("VOICETUTOR_PROMPTS_FILE", "/data/prompts.json");
            env::set_var("VOICETUTOR_LANGUAGE", "en-US");
        }

        let config = load_config(None, None, Some(config_path)).unwrap();
        clear_env();

        assert_eq!(config.gemini.api_key, "env-gemini");
        assert_eq!(config.speech.api_key, "env-speech");
        assert_eq!(config.lessons_dir, PathBuf::from("/data/lessons"));
        assert_eq!(config.prompts_file, Some(PathBuf::from("/data/prompts.json")));
        assert_eq!(config.default_language, "en-US");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("GEMINI_API_KEY", "  ");
        }

        let temp_dir = TempDir::new().unwrap();
        let config = load_config(None, None, Some(temp_dir.path().join("missing.json"))).unwrap();
        clear_env();

        assert!(!config.gemini.has_api_key());
    }

    #[test]
    fn test_cli_flag_override() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("VOICETUTOR_LANGUAGE", "bn-IN");
        }

        let temp_dir = TempDir::new().unwrap();
        let config = load_config(
            Some("gemini-2.5-flash".to_string()),
            Some("en-GB".to_string()),
            Some(temp_dir.path().join("missing.json")),
        )
        .unwrap();
        clear_env();

        assert_eq!(config.gemini.default_model, "gemini-2.5-flash");
        assert_eq!(config.default_language, "en-GB");
    }
}
