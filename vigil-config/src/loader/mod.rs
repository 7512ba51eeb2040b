use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use tracing::debug;
use url::Url;

pub mod error;

use crate::{
    models::{
        AuthConfig, Config, ConfigMetadata, DatabaseConfig, RedisConfig,
        ServerConfig,
        detector::{DetectorConfigSource, load_detector_settings},
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigWarnings},
};
use error::ConfigLoadError;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![PathBuf::from("vigil.toml"), PathBuf::from("config/vigil.toml")]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Reads `.env`, the process environment and the config file, then
    /// composes them with environment values taking precedence.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Composes configuration from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (Some(path.clone()), true)
        } else if let Some(path) = &env.config_path {
            (Some(path.clone()), true)
        } else {
            let found = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
            (found, false)
        };

        let Some(path) = path else {
            return Ok((None, None));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|err| {
            ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            }
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        debug!("Loaded configuration from {}", path.display());
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No vigil.toml detected; falling back to environment variables",
                "Create vigil.toml or set VIGIL_CONFIG_PATH",
            );
        }

        let FileConfig {
            server: file_server,
            database: file_database,
            redis: file_redis,
            auth: file_auth,
            detector: file_detector,
        } = file_config.unwrap_or_default();

        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: env
                .server_host
                .clone()
                .or(file_server.host)
                .unwrap_or(defaults.host),
            port: env.server_port.or(file_server.port).unwrap_or(defaults.port),
        };

        let database = DatabaseConfig {
            primary_url: resolve_database_url(
                env.database_url.clone().or(file_database.url),
            )?,
        };

        let redis = match env
            .redis_url
            .clone()
            .or_else(|| file_redis.map(|r| r.url))
            .filter(|url| !url.trim().is_empty())
        {
            Some(url) => {
                Url::parse(url.trim()).map_err(|source| {
                    ConfigLoadError::InvalidRedisUrl { source }
                })?;
                Some(RedisConfig { url })
            }
            None => None,
        };

        let auth = AuthConfig {
            operator_token: env
                .operator_token
                .clone()
                .or(file_auth.operator_token)
                .filter(|token| !token.trim().is_empty()),
        };

        let (mut detector, detector_source) = if let Some(detector) = file_detector
        {
            let path = config_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("vigil.toml"));
            (detector, DetectorConfigSource::File(path))
        } else {
            load_detector_settings(&env).map_err(ConfigLoadError::Detector)?
        };
        if let Some(log_flags) = env.log_flags {
            detector.log_flags = log_flags;
        }
        if let Some(auto_delete) = env.auto_delete {
            detector.auto_delete = auto_delete;
        }

        let config = Config {
            server,
            database,
            redis,
            auth,
            detector,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
                detector_source,
            },
        };

        warnings.extend(validation::collect_warnings(&config));
        Ok((config, warnings))
    }
}

fn resolve_database_url(
    raw: Option<String>,
) -> Result<Option<String>, ConfigLoadError> {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    let parsed = Url::parse(raw.trim())
        .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(Some(raw.trim().to_string())),
        other => Err(ConfigLoadError::UnsupportedDatabaseScheme {
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn env_overrides_file_values() {
        let file = write_config(
            r#"
            [server]
            host = "127.0.0.1"
            port = 4000

            [database]
            url = "postgres://vigil@localhost/vigil"

            [auth]
            operator_token = "from-file"

            [detector]
            recheck_cleared = true
            "#,
        );
        let env = EnvConfig {
            server_port: Some(5000),
            operator_token: Some("from-env".to_string()),
            log_flags: Some(true),
            ..EnvConfig::default()
        };

        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .unwrap();
        let config = load.config;
        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(
            config.database.primary_url.as_deref(),
            Some("postgres://vigil@localhost/vigil")
        );
        assert_eq!(config.auth.operator_token.as_deref(), Some("from-env"));
        assert!(config.detector.recheck_cleared);
        assert!(config.detector.log_flags);
        assert_eq!(
            config.metadata.detector_source,
            DetectorConfigSource::File(file.path().to_path_buf())
        );
        assert!(config.metadata.config_path.is_some());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/definitely/not/here/vigil.toml")
            .load_with_env(EnvConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let file = write_config("[server\nport = ");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default(), false)
            .unwrap_err();
        match err {
            ConfigLoadError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_postgres_database() {
        let env = EnvConfig {
            database_url: Some("mysql://root@localhost/vigil".to_string()),
            ..EnvConfig::default()
        };
        let file = write_config("");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::UnsupportedDatabaseScheme { ref scheme } if scheme == "mysql"
        ));
    }

    #[test]
    fn bare_config_warns_about_degraded_backends() {
        let file = write_config("");
        let env = EnvConfig {
            detector_config_json: Some(r#"{"flagged_count_ttl_secs": 0}"#.to_string()),
            ..EnvConfig::default()
        };
        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .unwrap();
        assert_eq!(load.config.server, ServerConfig::default());
        assert_eq!(load.config.metadata.detector_source, DetectorConfigSource::EnvInline);

        let messages: Vec<&str> =
            load.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.starts_with("DATABASE_URL")));
        assert!(messages.iter().any(|m| m.starts_with("REDIS_URL")));
        assert!(messages.iter().any(|m| m.starts_with("VIGIL_OPERATOR_TOKEN")));
        assert!(messages.iter().any(|m| m.contains("flagged_count_ttl_secs")));
    }
}
