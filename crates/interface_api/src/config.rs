//! API configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::Timezone;
use domain_visit::{GeoBounds, VisitRules};

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Reporting timezone; calendar days and months are derived in it
    pub timezone: String,
    /// How far back a visit may be recorded, in days
    pub backdate_window_days: u32,
    /// Geo fence overrides; unset fields keep the India defaults
    pub geo_min_latitude: Option<Decimal>,
    pub geo_max_latitude: Option<Decimal>,
    pub geo_min_longitude: Option<Decimal>,
    pub geo_max_longitude: Option<Decimal>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/fieldforce".to_string(),
            log_level: "info".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            backdate_window_days: 90,
            geo_min_latitude: None,
            geo_max_latitude: None,
            geo_min_longitude: None,
            geo_max_longitude: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves the configured reporting timezone.
    ///
    /// An unknown name falls back to UTC with a warning rather than
    /// refusing to start.
    pub fn reporting_timezone(&self) -> Timezone {
        match Timezone::parse(&self.timezone) {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!(
                    timezone = %self.timezone,
                    error = %e,
                    "Unknown reporting timezone, falling back to UTC"
                );
                Timezone::default()
            }
        }
    }

    /// Visit validation rules derived from this configuration
    pub fn visit_rules(&self) -> VisitRules {
        let defaults = GeoBounds::default();
        VisitRules {
            backdate_window_days: self.backdate_window_days,
            geo_bounds: GeoBounds {
                min_latitude: self.geo_min_latitude.unwrap_or(defaults.min_latitude),
                max_latitude: self.geo_max_latitude.unwrap_or(defaults.max_latitude),
                min_longitude: self.geo_min_longitude.unwrap_or(defaults.min_longitude),
                max_longitude: self.geo_max_longitude.unwrap_or(defaults.max_longitude),
            },
            timezone: self.reporting_timezone(),
        }
    }
}
