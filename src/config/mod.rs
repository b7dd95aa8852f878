use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub introspection: IntrospectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    /// Replaces the database path of `url` when set
    pub name: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub default_row_limit: i64,
    pub max_row_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    /// Tables hidden from `/tables` by exact name
    pub excluded_tables: Vec<String>,
    /// Tables starting with any of these prefixes are hidden from `/tables`
    pub excluded_prefixes: Vec<String>,
    /// Columns never reported by `/tables/:table/fields`
    pub hidden_columns: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("JSONFORM_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            self.database.backend = parse_backend(&v).unwrap_or(self.database.backend);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_NAME") {
            self.database.name = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_DEFAULT_ROW_LIMIT") {
            self.api.default_row_limit = v.parse().unwrap_or(self.api.default_row_limit);
        }
        if let Ok(v) = env::var("API_MAX_ROW_LIMIT") {
            self.api.max_row_limit = v.parse().unwrap_or(self.api.max_row_limit);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Introspection overrides
        if let Ok(v) = env::var("INTROSPECTION_EXCLUDED_TABLES") {
            self.introspection.excluded_tables = split_list(&v);
        }
        if let Ok(v) = env::var("INTROSPECTION_EXCLUDED_PREFIXES") {
            self.introspection.excluded_prefixes = split_list(&v);
        }
        if let Ok(v) = env::var("INTROSPECTION_HIDDEN_COLUMNS") {
            self.introspection.hidden_columns = split_list(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                name: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                default_row_limit: 100,
                max_row_limit: 1000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            introspection: IntrospectionConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                name: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                default_row_limit: 100,
                max_row_limit: 500,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            introspection: IntrospectionConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                name: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                default_row_limit: 50,
                max_row_limit: 100,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            introspection: IntrospectionConfig::default(),
        }
    }
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            excluded_tables: vec!["forms".to_string()],
            excluded_prefixes: vec!["form_".to_string(), "_sqlx".to_string()],
            hidden_columns: vec!["id".to_string()],
        }
    }
}

fn parse_backend(value: &str) -> Option<StorageBackend> {
    match value.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Some(StorageBackend::Postgres),
        "memory" | "mem" => Some(StorageBackend::Memory),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StorageBackend::Postgres);
        assert!(config.database.run_migrations);
        assert_eq!(config.api.max_row_limit, 1000);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.run_migrations);
        assert_eq!(config.api.max_row_limit, 100);
        assert!(config.api.default_row_limit <= config.api.max_row_limit);
    }

    #[test]
    fn introspection_defaults_hide_bookkeeping_tables() {
        let config = IntrospectionConfig::default();
        assert_eq!(config.excluded_tables, vec!["forms".to_string()]);
        assert!(config.excluded_prefixes.contains(&"form_".to_string()));
        assert_eq!(config.hidden_columns, vec!["id".to_string()]);
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!(parse_backend("Memory"), Some(StorageBackend::Memory));
        assert_eq!(parse_backend("pg"), Some(StorageBackend::Postgres));
        assert_eq!(parse_backend("sqlite"), None);
    }

    #[test]
    fn splits_comma_lists() {
        assert_eq!(split_list(" a, b ,,c"), vec!["a", "b", "c"]);
    }
}
