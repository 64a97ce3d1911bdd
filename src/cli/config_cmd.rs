//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, BackendKind, FfmpegConfig};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    validate_config_value(key, value)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    presenter.output(read_value(&config, key).as_deref().unwrap_or(NOT_SET));

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

/// Store a validated value under its key
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "backend" => config.backend = Some(value.trim().to_lowercase()),
        "tick_interval" => config.tick_interval = Some(value.trim().to_string()),
        "output_dir" => config.output_dir = Some(value.to_string()),
        "notify" => config.notify = Some(bool_value(key, value)?),
        "ffmpeg.input_format" => {
            config.ffmpeg.get_or_insert_with(FfmpegConfig::default).input_format =
                Some(value.to_string())
        }
        "ffmpeg.input_device" => {
            config.ffmpeg.get_or_insert_with(FfmpegConfig::default).input_device =
                Some(value.to_string())
        }
        _ => return check_key(key),
    }
    Ok(())
}

/// Raw value stored under a key, if set
fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "backend" => config.backend.clone(),
        "tick_interval" => config.tick_interval.clone(),
        "output_dir" => config.output_dir.clone(),
        "notify" => config.notify.map(|b| b.to_string()),
        "ffmpeg.input_format" => config.ffmpeg.as_ref().and_then(|f| f.input_format.clone()),
        "ffmpeg.input_device" => config.ffmpeg.as_ref().and_then(|f| f.input_device.clone()),
        _ => None,
    }
}

/// Validate a config value based on key type
fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "backend" => {
            value
                .parse::<BackendKind>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "tick_interval" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "notify" => {
            bool_value(key, value)?;
        }
        "ffmpeg.input_format" | "ffmpeg.input_device" => {
            if value.trim().is_empty() {
                return Err(invalid("Value must not be empty".to_string()));
            }
        }
        _ => {} // output_dir accepts any path
    }
    Ok(())
}

fn bool_value(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| ConfigError::ValidationError {
        key: key.to_string(),
        message: "Value must be 'true' or 'false'".to_string(),
    })
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgConfigStore;
    use tempfile::TempDir;

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("false"), Ok(false));
        assert_eq!(parse_bool("yes"), Ok(true));
        assert_eq!(parse_bool("no"), Ok(false));
        assert_eq!(parse_bool("1"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("invalid").is_err());
    }

    #[test]
    fn validate_backend() {
        assert!(validate_config_value("backend", "cpal").is_ok());
        assert!(validate_config_value("backend", "FFMPEG").is_ok());
        assert!(validate_config_value("backend", "gstreamer").is_err());
    }

    #[test]
    fn validate_tick_interval() {
        assert!(validate_config_value("tick_interval", "1s").is_ok());
        assert!(validate_config_value("tick_interval", "250ms").is_ok());
        assert!(validate_config_value("tick_interval", "0s").is_err());
        assert!(validate_config_value("tick_interval", "often").is_err());
    }

    #[test]
    fn validate_ffmpeg_fields_reject_blank() {
        assert!(validate_config_value("ffmpeg.input_format", "alsa").is_ok());
        assert!(validate_config_value("ffmpeg.input_device", "  ").is_err());
    }

    #[test]
    fn apply_nested_value_creates_section() {
        let mut config = AppConfig::empty();
        apply_value(&mut config, "ffmpeg.input_device", "hw:1").unwrap();
        assert_eq!(
            read_value(&config, "ffmpeg.input_device").as_deref(),
            Some("hw:1")
        );
        assert!(read_value(&config, "ffmpeg.input_format").is_none());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = check_key("api_key").unwrap_err();
        assert!(err.to_string().contains("Unknown key"));
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_store() {
        let dir = TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        let presenter = Presenter::new();

        handle_set(&store, &presenter, "backend", "FFmpeg").await.unwrap();
        handle_set(&store, &presenter, "notify", "yes").await.unwrap();

        let config = store.load().await.unwrap();
        assert_eq!(config.backend.as_deref(), Some("ffmpeg"));
        assert_eq!(config.notify, Some(true));
    }

    #[tokio::test]
    async fn invalid_value_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        let presenter = Presenter::new();

        assert!(handle_set(&store, &presenter, "notify", "maybe")
            .await
            .is_err());
        assert!(!store.exists());
    }
}
