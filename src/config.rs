use std::time::Duration;

use crate::actors::order_list::ControllerSettings;
use crate::domain::order::{FilterDefaults, PageSize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Console configuration loaded from environment variables.
///
/// | Env Var                           | Default                |
/// |-----------------------------------|------------------------|
/// | `CONSOLE_SEARCH_DEBOUNCE_MS`      | `800`                  |
/// | `CONSOLE_DEFAULT_PAGE_SIZE`       | `20`                   |
/// | `CONSOLE_LOOKBACK_MONTHS`         | `3`                    |
/// | `ORDER_SERVICE_URL`               | unset (in-memory)      |
/// | `ORDER_SERVICE_TIMEOUT_SECS`      | `30`                   |
/// | `CONSOLE_METRICS_PORT`            | unset (disabled)       |
/// | `CONSOLE_DEFAULT_FAILURE_MESSAGE` | `Something went wrong` |
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub search_debounce: Duration,
    pub default_page_size: PageSize,
    pub lookback_months: u32,
    /// Base URL of the order REST API. `None` runs against sample data.
    pub order_service_url: Option<String>,
    pub order_service_timeout: Duration,
    pub metrics_port: Option<u16>,
    pub default_failure_message: String,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let debounce_ms: u64 = parse(&get, "CONSOLE_SEARCH_DEBOUNCE_MS", "a number of milliseconds")?.unwrap_or(800);

        let page_size = parse::<u32, _>(&get, "CONSOLE_DEFAULT_PAGE_SIZE", "one of 10, 20, 30, 50, 100")?
            .map(|raw| {
                PageSize::try_from(raw).map_err(|_| ConfigError::Invalid {
                    var: "CONSOLE_DEFAULT_PAGE_SIZE",
                    expected: "one of 10, 20, 30, 50, 100",
                    value: raw.to_string(),
                })
            })
            .transpose()?
            .unwrap_or_default();

        let lookback_months: u32 = parse(&get, "CONSOLE_LOOKBACK_MONTHS", "a number of months")?.unwrap_or(3);
        let timeout_secs: u64 = parse(&get, "ORDER_SERVICE_TIMEOUT_SECS", "a number of seconds")?.unwrap_or(30);
        let metrics_port: Option<u16> = parse(&get, "CONSOLE_METRICS_PORT", "a valid port")?;

        let order_service_url = match get("ORDER_SERVICE_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.trim_end_matches('/').to_string())
            }
            Some(url) => {
                return Err(ConfigError::Invalid {
                    var: "ORDER_SERVICE_URL",
                    expected: "an http(s) URL",
                    value: url,
                })
            }
            None => None,
        };

        Ok(Self {
            search_debounce: Duration::from_millis(debounce_ms),
            default_page_size: page_size,
            lookback_months,
            order_service_url,
            order_service_timeout: Duration::from_secs(timeout_secs),
            metrics_port,
            default_failure_message: get("CONSOLE_DEFAULT_FAILURE_MESSAGE")
                .unwrap_or_else(|| "Something went wrong".to_string()),
        })
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            search_debounce: self.search_debounce,
            filter_defaults: FilterDefaults {
                lookback_months: self.lookback_months,
                page_size: self.default_page_size,
            },
            default_failure_message: self.default_failure_message.clone(),
        }
    }
}

fn parse<T, G>(get: &G, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { var, expected, value })
        })
        .transpose()
}
