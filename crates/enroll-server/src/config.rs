//! Configuration management

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default time to wait for in-flight enrollment jobs on shutdown, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

// ============================================================================
// External Service Constants
// ============================================================================

/// Default Employer Directory base URL.
pub const DEFAULT_EMPLOYER_SERVICE_URL: &str = "http://localhost:5001";

/// Default User Directory base URL.
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:5002";

/// Default timeout for directory and download requests in seconds.
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Enrollment Worker Constants
// ============================================================================

/// Default number of enrollment jobs allowed to run at once.
pub const DEFAULT_MAX_DEGREE_OF_PARALLELISM: usize = 4;

/// Default interval between "no available slots" diagnostics, in milliseconds.
pub const DEFAULT_NO_SLOT_DELAY_MS: u64 = 1000;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// `None` selects the in-memory enrollment store
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub directories: DirectoryConfig,
    pub enrollment: EnrollmentConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Base URLs of the Employer and User directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub employer_service_url: String,
    pub user_service_url: String,
    pub timeout_secs: u64,
}

/// Worker pool and file handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    pub max_degree_of_parallelism: usize,
    pub no_available_slots_delay_ms: u64,
    pub download_dir: PathBuf,
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EnrollmentConfig {
    pub fn no_available_slots_delay(&self) -> Duration {
        Duration::from_millis(self.no_available_slots_delay_ms)
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_degree_of_parallelism: DEFAULT_MAX_DEGREE_OF_PARALLELISM,
            no_available_slots_delay_ms: DEFAULT_NO_SLOT_DELAY_MS,
            download_dir: std::env::temp_dir(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read configuration from the current environment without validating
    pub fn from_env() -> Self {
        let database = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            });

        Config {
            server: ServerConfig {
                host: env_string_or("ENROLL_HOST", DEFAULT_SERVER_HOST),
                port: env_or("ENROLL_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "ENROLL_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database,
            cors: CorsConfig {
                allowed_origins: env_string_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", false),
            },
            directories: DirectoryConfig {
                employer_service_url: env_string_or(
                    "EMPLOYER_SERVICE_URL",
                    DEFAULT_EMPLOYER_SERVICE_URL,
                ),
                user_service_url: env_string_or("USER_SERVICE_URL", DEFAULT_USER_SERVICE_URL),
                timeout_secs: env_or("EXTERNAL_TIMEOUT_SECS", DEFAULT_EXTERNAL_TIMEOUT_SECS),
            },
            enrollment: EnrollmentConfig {
                max_degree_of_parallelism: env_or(
                    "ENROLLMENT_MAX_DEGREE_OF_PARALLELISM",
                    DEFAULT_MAX_DEGREE_OF_PARALLELISM,
                ),
                no_available_slots_delay_ms: env_or(
                    "ENROLLMENT_NO_SLOT_DELAY_MS",
                    DEFAULT_NO_SLOT_DELAY_MS,
                ),
                download_dir: std::env::var("ENROLLMENT_DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| std::env::temp_dir()),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if let Some(ref database) = self.database {
            if database.max_connections == 0 {
                anyhow::bail!("Database max_connections must be greater than 0");
            }

            if database.min_connections > database.max_connections {
                anyhow::bail!(
                    "Database min_connections ({}) cannot be greater than max_connections ({})",
                    database.min_connections,
                    database.max_connections
                );
            }
        }

        if self.enrollment.max_degree_of_parallelism == 0 {
            anyhow::bail!("Enrollment max degree of parallelism must be at least 1");
        }

        for (name, url) in [
            ("Employer", &self.directories.employer_service_url),
            ("User", &self.directories.user_service_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} service URL must start with http:// or https://: {}", name, url);
            }
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            anyhow::bail!("CORS credentials cannot be allowed together with a wildcard origin");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: None,
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
            directories: DirectoryConfig {
                employer_service_url: DEFAULT_EMPLOYER_SERVICE_URL.to_string(),
                user_service_url: DEFAULT_USER_SERVICE_URL.to_string(),
                timeout_secs: DEFAULT_EXTERNAL_TIMEOUT_SECS,
            },
            enrollment: EnrollmentConfig::default(),
        }
    }
}
