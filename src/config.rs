use crate::datasource::http::DEFAULT_REQUEST_TIMEOUT;
use crate::datasource::meli::DEFAULT_MELI_API_URL;
use crate::datasource::mercadopago::DEFAULT_MP_API_URL;
use crate::domain::Decimal;
use crate::engine::{PivotMode, PriceField, ShippingRules, SplitPolicy};
use chrono::{FixedOffset, Offset, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub meli_api_url: String,
    /// Static marketplace token; when unset the token is read from the sheet.
    pub meli_access_token: Option<String>,
    pub mp_api_url: String,
    /// Enables the per-payment tax lookup.
    pub mp_access_token: Option<String>,
    pub sheet: Option<SheetConfig>,
    pub tokens_sheet: String,
    pub tokens_cell: String,
    pub costs_sheet: String,
    /// Local CSV cost table; preferred over the sheet when set.
    pub costs_csv_path: Option<String>,
    pub shipping: ShippingRules,
    pub date_pivot: PivotMode,
    pub paid_lookback_days: i64,
    pub utc_offset: FixedOffset,
    pub interest_free_column: bool,
    pub concurrency: usize,
    pub cache_ttl: Duration,
    /// Limit on one upstream HTTP attempt.
    pub http_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub sheet_id: String,
    pub api_key: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 3000u16, "must be a valid u16")?;

        let meli_api_url = string_or(&env_map, "MELI_API_URL", DEFAULT_MELI_API_URL);
        let mp_api_url = string_or(&env_map, "MP_API_URL", DEFAULT_MP_API_URL);
        let meli_access_token = non_empty(&env_map, "MELI_ACCESS_TOKEN");
        let mp_access_token = non_empty(&env_map, "MP_ACCESS_TOKEN");

        let sheet = match non_empty(&env_map, "GS_SHEET_ID") {
            Some(sheet_id) => {
                let api_key = non_empty(&env_map, "GS_API_KEY")
                    .ok_or_else(|| ConfigError::MissingEnv("GS_API_KEY".to_string()))?;
                Some(SheetConfig { sheet_id, api_key })
            }
            None => None,
        };

        let free_threshold = env_map
            .get("FREE_SHIPPING_THRESHOLD")
            .map(|s| s.as_str())
            .unwrap_or("33000")
            .parse::<Decimal>()
            .ok()
            .filter(|d| !d.is_negative())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "FREE_SHIPPING_THRESHOLD".to_string(),
                    "must be a non-negative number".to_string(),
                )
            })?;
        let inclusive = parse_bool(&env_map, "FREE_SHIPPING_INCLUSIVE", true)?;
        let price_field = env_map
            .get("FREE_SHIPPING_PRICE_FIELD")
            .map(|s| s.as_str())
            .unwrap_or("base")
            .parse::<PriceField>()
            .map_err(|e| {
                ConfigError::InvalidValue(
                    "FREE_SHIPPING_PRICE_FIELD".to_string(),
                    format!("must be base or final, {}", e),
                )
            })?;
        let split = env_map
            .get("SHIPPING_SPLIT")
            .map(|s| s.as_str())
            .unwrap_or("by_price")
            .parse::<SplitPolicy>()
            .map_err(|e| {
                ConfigError::InvalidValue(
                    "SHIPPING_SPLIT".to_string(),
                    format!("must be first, even, or by_price, {}", e),
                )
            })?;

        let date_pivot = env_map
            .get("DATE_PIVOT")
            .map(|s| s.as_str())
            .unwrap_or("created")
            .parse::<PivotMode>()
            .map_err(|e| ConfigError::InvalidValue("DATE_PIVOT".to_string(), e))?;

        let paid_lookback_days = parse_or(&env_map, "PAID_LOOKBACK_DAYS", 7i64, "must be a valid i64")?;
        if paid_lookback_days < 0 {
            return Err(ConfigError::InvalidValue(
                "PAID_LOOKBACK_DAYS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let offset_minutes = parse_or(&env_map, "UTC_OFFSET_MINUTES", -180i32, "must be a valid i32")?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "UTC_OFFSET_MINUTES".to_string(),
                    "must be within +/- 24 hours".to_string(),
                )
            })?;

        let interest_free_column = parse_bool(&env_map, "ROW_INTEREST_FREE_COLUMN", false)?;

        let concurrency = parse_or(&env_map, "CONCURRENCY", 5usize, "must be a valid usize")?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let cache_ttl_secs = parse_or(&env_map, "CACHE_TTL_SECS", 300u64, "must be a valid u64")?;

        let http_timeout_secs = parse_or(&env_map, "HTTP_TIMEOUT_SECS", 15u64, "must be a valid u64")?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HTTP_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            port,
            meli_api_url,
            meli_access_token,
            mp_api_url,
            mp_access_token,
            sheet,
            tokens_sheet: string_or(&env_map, "GS_TOKENS_SHEET", "Tokens"),
            tokens_cell: string_or(&env_map, "GS_TOKENS_CELL", "A2"),
            costs_sheet: string_or(&env_map, "GS_COSTS_SHEET", "Comparador"),
            costs_csv_path: non_empty(&env_map, "COSTS_CSV_PATH"),
            shipping: ShippingRules {
                free_threshold,
                inclusive,
                price_field,
                split,
            },
            date_pivot,
            paid_lookback_days,
            utc_offset,
            interest_free_column,
            concurrency,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// A1 range of the cell holding the marketplace access token.
    pub fn tokens_range(&self) -> String {
        format!("{}!{}", self.tokens_sheet, self.tokens_cell)
    }

    /// A1 range of the cost table: item id in column A, unit cost in column M.
    pub fn costs_range(&self) -> String {
        format!("{}!A2:M", self.costs_sheet)
    }

    /// Header plus the first rows of the cost sheet, for diagnostics.
    pub fn costs_raw_range(&self) -> String {
        format!("{}!A1:M50", self.costs_sheet)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            meli_api_url: DEFAULT_MELI_API_URL.to_string(),
            meli_access_token: None,
            mp_api_url: DEFAULT_MP_API_URL.to_string(),
            mp_access_token: None,
            sheet: None,
            tokens_sheet: "Tokens".to_string(),
            tokens_cell: "A2".to_string(),
            costs_sheet: "Comparador".to_string(),
            costs_csv_path: None,
            shipping: ShippingRules::default(),
            date_pivot: PivotMode::default(),
            paid_lookback_days: 7,
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
            interest_free_column: false,
            concurrency: 5,
            cache_ttl: Duration::from_secs(300),
            http_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn string_or(env_map: &HashMap<String, String>, key: &str, default: &str) -> String {
    non_empty(env_map, key).unwrap_or_else(|| default.to_string())
}

fn non_empty(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    reason: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), reason.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(
    env_map: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("must be true or false, got {}", other),
            )),
        },
    }
}
