use anyhow::{bail, Result};
use std::env;

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub jwt_secret: String,
    pub app_base_url: String,
    pub billing_portal_url: String,
    pub seed_demo_data: bool,
    pub login_rate_limit_per_minute: usize,
    /// Only set behind a reverse proxy that rewrites `x-forwarded-for`
    pub trust_proxy_headers: bool,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).map(|v| v.to_lowercase()).as_deref(),
        Ok("1" | "true" | "yes")
    )
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env_or("PORT", "3000").parse().unwrap_or(3000);
        let log_format = match env_or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let login_rate_limit_per_minute = env_or("LOGIN_RATE_LIMIT_PER_MINUTE", "10").parse().unwrap_or(10);

        let config = AppConfig {
            host: env_or("HOST", "0.0.0.0"),
            port,
            environment: env_or("ENVIRONMENT", "development"),
            log_level: env_or("LOG_LEVEL", "info"),
            log_format,
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            app_base_url: env_or("APP_BASE_URL", "http://localhost:5173"),
            billing_portal_url: env_or("BILLING_PORTAL_URL", "https://billing.example.com/portal"),
            seed_demo_data: env_flag("SEED_DEMO_DATA"),
            login_rate_limit_per_minute,
            trust_proxy_headers: env_flag("TRUST_PROXY_HEADERS"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if self.jwt_secret.len() < 16 {
            bail!("JWT_SECRET must be at least 16 characters");
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
