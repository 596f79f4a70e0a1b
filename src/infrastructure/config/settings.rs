//! Feed Client Configuration Settings
//!
//! Configuration types loaded from environment variables. Credentials are
//! deliberately not captured here: the supervisor re-reads its credential
//! source on every connection attempt (see `infrastructure::auth`).

use std::time::Duration;

/// Environment variable holding the feed WebSocket URL.
pub const FEED_URL_VAR: &str = "FEED_URL";

/// Environment variable holding the initial comma-separated topic list.
pub const FEED_SYMBOLS_VAR: &str = "FEED_SYMBOLS";

/// Configuration error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// A required value is empty.
    #[error("value for {0} cannot be empty")]
    EmptyValue(String),
    /// A header value could not be constructed from configuration.
    #[error("invalid header value for {0}")]
    InvalidHeader(String),
}

/// WebSocket connection settings.
///
/// The defaults preserve the feed's availability posture: a fixed retry
/// delay (initial == max, multiplier 1.0, no jitter) and unlimited
/// attempts. Exponential backoff is available by raising the max delay
/// and multiplier.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Liveness probe interval.
    pub heartbeat_interval: Duration,
    /// Time allowed for a probe response before the connection is
    /// considered dead.
    pub heartbeat_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier (1.0 = fixed delay).
    pub reconnect_delay_multiplier: f64,
    /// Jitter factor as a fraction of the delay (0.0 = none).
    pub reconnect_jitter_factor: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(20),
            heartbeat_timeout: Duration::from_secs(10),
            reconnect_delay_initial: Duration::from_secs(5),
            reconnect_delay_max: Duration::from_secs(5),
            reconnect_delay_multiplier: 1.0,
            reconnect_jitter_factor: 0.0,
            max_reconnect_attempts: 0,
        }
    }
}

/// Dispatcher hand-off settings.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Capacity of the bounded queue between the transport loop and the
    /// consumer worker.
    pub queue_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 4_096,
        }
    }
}

/// Complete feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed WebSocket URL (fixed per deployment).
    pub url: String,
    /// Topics to subscribe to at startup.
    pub symbols: Vec<String>,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Dispatcher settings.
    pub dispatch: DispatchSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `FEED_URL` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(FEED_URL_VAR)
            .map_err(|_| ConfigError::MissingEnvVar(FEED_URL_VAR.to_string()))?;
        if url.is_empty() {
            return Err(ConfigError::EmptyValue(FEED_URL_VAR.to_string()));
        }

        let symbols = std::env::var(FEED_SYMBOLS_VAR)
            .map(|raw| parse_symbol_list(&raw))
            .unwrap_or_default();

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            heartbeat_interval: parse_env_duration_secs(
                "FEED_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval,
            ),
            heartbeat_timeout: parse_env_duration_secs(
                "FEED_HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout,
            ),
            reconnect_delay_initial: parse_env_duration_millis(
                "FEED_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "FEED_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: sanitize_multiplier(parse_env_f64(
                "FEED_RECONNECT_DELAY_MULTIPLIER",
                defaults.reconnect_delay_multiplier,
            )),
            reconnect_jitter_factor: sanitize_jitter(parse_env_f64(
                "FEED_RECONNECT_JITTER_FACTOR",
                defaults.reconnect_jitter_factor,
            )),
            max_reconnect_attempts: parse_env_u32(
                "FEED_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
        };

        let dispatch = DispatchSettings {
            queue_capacity: parse_env_usize(
                "FEED_DISPATCH_QUEUE_CAPACITY",
                DispatchSettings::default().queue_capacity,
            ),
        };

        Ok(Self {
            url,
            symbols,
            websocket,
            dispatch,
        })
    }
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Multipliers below 1.0 (or non-finite) would shrink or corrupt the
/// delay; treat them as a fixed delay.
fn sanitize_multiplier(value: f64) -> f64 {
    if value.is_finite() { value.max(1.0) } else { 1.0 }
}

/// Jitter is a fraction of the delay; out-of-range values would produce
/// negative durations.
fn sanitize_jitter(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
