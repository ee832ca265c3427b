use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub api_secret: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_write_requests: u32,
    pub rate_limit_timeout_ms: u64,
    pub caffeine_grid_minutes: u32,
    pub caffeine_half_life_hours: f64,
}

/// Reads an optional variable, treating an empty value as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match optional(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}

/// Rate-limit settings of zero would disable limiting or deny everything.
fn at_least_one<T: PartialOrd + From<u8> + std::fmt::Display>(name: &str, value: T) -> T {
    if value < T::from(1) {
        tracing::warn!("{} must be at least 1, got {}, using 1", name, value);
        T::from(1)
    } else {
        value
    }
}

fn limit_setting<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + From<u8> + std::fmt::Display,
{
    at_least_one(name, parsed_or(name, default))
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: optional("REDIS_URL"),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parsed_or("SERVER_PORT", 3000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            api_secret: optional("API_SECRET"),
            rate_limit_window_secs: limit_setting("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: limit_setting("RATE_LIMIT_REQUESTS", 60),
            rate_limit_write_requests: limit_setting("RATE_LIMIT_WRITE_REQUESTS", 10),
            rate_limit_timeout_ms: parsed_or("RATE_LIMIT_TIMEOUT_MS", 500),
            caffeine_grid_minutes: parsed_or("CAFFEINE_GRID_MINUTES", 15),
            caffeine_half_life_hours: parsed_or("CAFFEINE_HALF_LIFE_HOURS", 5.0),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_timeout(&self) -> Duration {
        Duration::from_millis(self.rate_limit_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_limit_settings_become_one() {
        assert_eq!(at_least_one("RATE_LIMIT_WINDOW", 0u64), 1);
        assert_eq!(at_least_one("RATE_LIMIT_REQUESTS", 0u32), 1);
        assert_eq!(at_least_one("RATE_LIMIT_REQUESTS", 60u32), 60);
    }
}
