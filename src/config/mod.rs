/// 환경 변수 기반 설정
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// 없으면 메모리 저장소를 사용한다
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub reset_database: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000".parse().ok())?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", Some(5))?,
            reset_database: parse_or(&lookup, "RESET_DATABASE", Some(false))?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Invalid {
            name,
            value: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 5);
        assert!(!config.reset_database);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/bidify"),
            ("DATABASE_MAX_CONNECTIONS", "10"),
            ("RESET_DATABASE", "true"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/bidify")
        );
        assert_eq!(config.database_max_connections, 10);
        assert!(config.reset_database);
    }

    #[test]
    fn test_invalid_value() {
        let result = config_from(&[("DATABASE_MAX_CONNECTIONS", "many")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "DATABASE_MAX_CONNECTIONS", .. })
        ));
    }
}
