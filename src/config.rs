//! Startup configuration (spec §6 "Configuration (environment)"): a small
//! `Deserialize` struct owned by the binary, the way `BotConfig` and
//! `parsing::manager::Config` are in the teacher, loaded from TOML and then
//! overlaid with environment variables so a deployment doesn't need a
//! checked-in secrets file.

use std::path::Path;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub school: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// When set, every raw RPC response body is written here before decoding,
    /// for offline replay against the deserializer (spec §6 "verbose raw-response
    /// capture flag").
    #[serde(default)]
    pub raw_response_dump_dir: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file as TOML")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting '{0}' (set it in the config file or as an environment variable)")]
    Missing(&'static str),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(ConfigError::Read { path: path.display().to_string(), source }),
        };

        let mut config: Config = if text.trim().is_empty() {
            Config { username: String::new(), password: String::new(), school: String::new(), base_url: None, raw_response_dump_dir: None }
        } else {
            toml::from_str(&text)?
        };

        config.overlay_env();
        config.validate()
    }

    fn overlay_env(&mut self) {
        if let Ok(value) = std::env::var("USERNAME") {
            self.username = value;
        }
        if let Ok(value) = std::env::var("PASSWORD") {
            self.password = value;
        }
        if let Ok(value) = std::env::var("SCHOOL") {
            self.school = value;
        }
        if let Ok(value) = std::env::var("RAW_RESPONSE_DUMP_DIR") {
            self.raw_response_dump_dir = Some(value);
        }
    }

    fn validate(self) -> Result<Config, ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        if self.school.is_empty() {
            return Err(ConfigError::Missing("school"));
        }
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://skoleportal.example.com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overlay_wins_over_file_contents() {
        std::env::set_var("USERNAME", "from_env");
        std::env::set_var("PASSWORD", "secret");
        std::env::set_var("SCHOOL", "Test Gymnasium");
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.username, "from_env");
        assert_eq!(config.school, "Test Gymnasium");
        std::env::remove_var("USERNAME");
        std::env::remove_var("PASSWORD");
        std::env::remove_var("SCHOOL");
    }

    #[test]
    fn missing_required_setting_is_an_error() {
        std::env::remove_var("USERNAME");
        std::env::remove_var("PASSWORD");
        std::env::remove_var("SCHOOL");
        assert!(matches!(Config::load("/nonexistent/path/config.toml"), Err(ConfigError::Missing("username"))));
    }
}
