use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Tunables for the catalog core: pagination, variant projection, bulk
/// insert batching, the reference timezone and the activation worker pool.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub page_size: u64,
    pub variant_display_limit: usize,
    pub variant_insert_batch: usize,
    pub tz_offset_hours: i32,
    pub activation_workers: usize,
    pub activation_poll: Duration,
    pub activation_max_attempts: i32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            variant_display_limit: 2,
            variant_insert_batch: 50,
            tz_offset_hours: 7,
            activation_workers: 2,
            activation_poll: Duration::from_millis(1000),
            activation_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub catalog: CatalogSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000);

        let defaults = CatalogSettings::default();
        let catalog = CatalogSettings {
            page_size: env_or("PRODUCT_PAGE_SIZE", defaults.page_size),
            variant_display_limit: env_or("VARIANT_DISPLAY_LIMIT", defaults.variant_display_limit),
            variant_insert_batch: env_or("VARIANT_INSERT_BATCH", defaults.variant_insert_batch),
            tz_offset_hours: env_or("TZ_OFFSET_HOURS", defaults.tz_offset_hours),
            activation_workers: env_or("ACTIVATION_WORKERS", defaults.activation_workers),
            activation_poll: Duration::from_millis(env_or("ACTIVATION_POLL_MS", 1000u64)),
            activation_max_attempts: env_or(
                "ACTIVATION_MAX_ATTEMPTS",
                defaults.activation_max_attempts,
            ),
        };

        Ok(Self {
            database_url,
            host,
            port,
            catalog,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
