use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, parse_cors_origins, parse_environment,
    parse_ssl_mode,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AccountSettings, AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

/// Shortest temporary password that can still carry a lowercase, uppercase and digit.
const MIN_TEMP_PASSWORD_LENGTH: usize = 6;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("LMS_HOST", "0.0.0.0");
        let port = env_or_default("LMS_PORT", "8000");

        let environment =
            parse_environment(env_optional("LMS_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("LMS_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "School LMS API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = env_number("ACCESS_TOKEN_EXPIRE_MINUTES", 720)?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let db_host = env_or_default("DB_HOST", "localhost");
        let db_port = env_number("DB_PORT", 5432)?;
        let db_user = env_or_default("DB_USER", "lms");
        let db_password = env_or_default("DB_PASSWORD", "");
        let db_name = env_or_default("DB_NAME", "school_lms");
        let database_url = env_optional("DATABASE_URL");
        let ssl_mode = parse_ssl_mode(env_optional("DB_SSL_MODE"))?;
        let ssl_ca = env_optional("DB_SSL_CA");
        let max_connections = env_number("DB_MAX_CONNECTIONS", 20)?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", 6379)?;
        let redis_db = env_number("REDIS_DB", 0)?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let temp_password_length = env_number("TEMP_PASSWORD_LENGTH", 10)?;
        let credentials_ttl_minutes = env_number("CREDENTIALS_TTL_MINUTES", 60)?;
        let max_import_size_kb = env_number("MAX_IMPORT_SIZE_KB", 1024)?;
        let max_import_rows = env_number("MAX_IMPORT_ROWS", 2000)?;

        let first_superuser_username = env_or_default("FIRST_SUPERUSER_USERNAME", "admin");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("LMS_LOG_LEVEL", "info");
        let json = env_flag("LMS_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                host: db_host,
                port: db_port,
                user: db_user,
                password: db_password,
                name: db_name,
                database_url,
                ssl_mode,
                ssl_ca,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            accounts: AccountSettings {
                temp_password_length,
                credentials_ttl_minutes,
                max_import_size_kb,
                max_import_rows,
            },
            admin: AdminSettings { first_superuser_username, first_superuser_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn accounts(&self) -> &AccountSettings {
        &self.accounts
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.temp_password_length < MIN_TEMP_PASSWORD_LENGTH {
            return Err(ConfigError::InvalidValue {
                field: "TEMP_PASSWORD_LENGTH",
                value: self.accounts.temp_password_length.to_string(),
            });
        }

        if self.accounts.max_import_rows == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_IMPORT_ROWS",
                value: String::from("0"),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_CONNECTIONS",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.password.is_empty() {
            return Err(ConfigError::MissingSecret("DB_PASSWORD"));
        }

        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
