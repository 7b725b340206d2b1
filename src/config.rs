use crate::error::{CarouselError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Management API credential
    pub management: ManagementConfig,
    /// Store persistence configuration
    pub store: StoreConfig,
    /// Egress IP-check configuration
    pub egress: EgressConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (default: 8080)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Public hostname advertised on the summary page
    pub public_host: String,
}

/// Shared static credential that distinguishes the operator/bot layer
/// from arbitrary internet callers. Coarse by design: it does not model
/// per-operator identity.
#[derive(Debug, Clone)]
pub struct ManagementConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the JSON document holding the client table
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EgressConfig {
    /// Plain-HTTP IP echo endpoint queried through the selected proxy
    pub check_url: Url,
    /// Timeout for the outbound check (default: 10s)
    pub check_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let port = get_env_or("CAROUSEL_PORT", "8080").parse().map_err(|_| {
            CarouselError::InvalidConfig("CAROUSEL_PORT must be a valid port number".into())
        })?;
        let host = get_env_or("CAROUSEL_HOST", "0.0.0.0");
        let public_host = get_env_or("CAROUSEL_PUBLIC_HOST", &format!("localhost:{}", port));

        Ok(Config {
            server: ServerConfig {
                port,
                host,
                public_host,
            },
            management: ManagementConfig {
                username: get_env_or("CAROUSEL_API_USERNAME", "admin"),
                password: get_env_or("CAROUSEL_API_PASSWORD", "admin"),
            },
            store: StoreConfig {
                path: PathBuf::from(get_env_or("CAROUSEL_CONFIG_FILE", "clients-config.json")),
            },
            egress: EgressConfig {
                check_url: parse_check_url()?,
                check_timeout: Duration::from_secs(
                    get_env_or("CAROUSEL_IP_CHECK_TIMEOUT", "10")
                        .parse()
                        .unwrap_or(10),
                ),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// The check endpoint must be plain HTTP with a concrete host: the egress
/// request is one absolute-form GET dialed through the client's proxy.
fn parse_check_url() -> Result<Url> {
    let raw = get_env_or("CAROUSEL_IP_CHECK_URL", "http://api.ipify.org/?format=json");

    let url = Url::parse(raw.trim()).map_err(|e| {
        CarouselError::InvalidConfig(format!("CAROUSEL_IP_CHECK_URL must be a valid URL: {}", e))
    })?;

    if url.scheme() != "http" {
        return Err(CarouselError::InvalidConfig(format!(
            "CAROUSEL_IP_CHECK_URL must use the http scheme, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(CarouselError::InvalidConfig(
            "CAROUSEL_IP_CHECK_URL must include a host".into(),
        ));
    }

    Ok(url)
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "CAROUSEL_PORT",
        "CAROUSEL_HOST",
        "CAROUSEL_PUBLIC_HOST",
        "CAROUSEL_API_USERNAME",
        "CAROUSEL_API_PASSWORD",
        "CAROUSEL_CONFIG_FILE",
        "CAROUSEL_IP_CHECK_URL",
        "CAROUSEL_IP_CHECK_TIMEOUT",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.public_host, "localhost:8080");
        assert_eq!(config.management.username, "admin");
        assert_eq!(config.store.path, PathBuf::from("clients-config.json"));
        assert_eq!(config.egress.check_url.host_str(), Some("api.ipify.org"));
        assert_eq!(config.egress.check_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("CAROUSEL_PORT", "9090");
        env::set_var("CAROUSEL_HOST", "127.0.0.1");
        env::set_var("CAROUSEL_PUBLIC_HOST", "proxy.example.com");
        env::set_var("CAROUSEL_API_USERNAME", "operator");
        env::set_var("CAROUSEL_API_PASSWORD", "s3cret");
        env::set_var("CAROUSEL_CONFIG_FILE", "/var/lib/carousel/clients.json");
        env::set_var("CAROUSEL_IP_CHECK_URL", "http://ifconfig.me/ip");
        env::set_var("CAROUSEL_IP_CHECK_TIMEOUT", "5");

        let config = Config::from_env().unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server_addr(), "127.0.0.1:9090");
        assert_eq!(config.server.public_host, "proxy.example.com");
        assert_eq!(config.management.username, "operator");
        assert_eq!(config.management.password, "s3cret");
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/carousel/clients.json")
        );
        assert_eq!(config.egress.check_url.host_str(), Some("ifconfig.me"));
        assert_eq!(config.egress.check_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_env_invalid_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("CAROUSEL_PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CarouselError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_rejects_https_check_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("CAROUSEL_IP_CHECK_URL", "https://api.ipify.org/?format=json");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CarouselError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_rejects_malformed_check_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("CAROUSEL_IP_CHECK_URL", "not a url");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CarouselError::InvalidConfig(_)));
    }
}
