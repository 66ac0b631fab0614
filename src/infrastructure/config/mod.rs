use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::application::use_cases::normalizer::DatePolicy;
use crate::domain::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "epidash.toml";
pub const ENV_CONFIG_PATH: &str = "EPIDASH_CONFIG";
pub const ENV_PREFIX: &str = "EPIDASH_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub http: HttpConfig,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Handling of stored dates that do not parse
    pub date_policy: DatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            http: HttpConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://epidash.db".to_string(),
            max_connections: 4,
            acquire_timeout_secs: 5,
            date_policy: DatePolicy::Lenient,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

pub struct ConfigService;

impl ConfigService {
    /// Defaults, then the TOML file, then `EPIDASH_*` variables (`__` nests).
    pub fn figment(config_path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<AppConfig> {
        let _ = dotenvy::dotenv();
        let path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let config: AppConfig = Self::figment(&path).extract()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config: AppConfig = ConfigService::figment("missing.toml").extract()?;
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "epidash.toml",
                r#"
                log_filter = "debug"

                [store]
                database_url = "sqlite://data/covid.db"
                date_policy = "strict"

                [http]
                port = 9000
                "#,
            )?;
            jail.set_env("EPIDASH_HTTP__PORT", "8080");

            let config: AppConfig = ConfigService::figment("epidash.toml").extract()?;
            assert_eq!(config.log_filter, "debug");
            assert_eq!(config.store.database_url, "sqlite://data/covid.db");
            assert_eq!(config.store.date_policy, DatePolicy::Strict);
            assert_eq!(config.store.max_connections, 4);
            assert_eq!(config.http.port, 8080);
            assert_eq!(config.http.host, "127.0.0.1");
            Ok(())
        });
    }
}
