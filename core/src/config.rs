//! Load-test configuration types
//!
//! A [`BenchConfig`] is parsed from a YAML document and describes the whole
//! run. [`BenchConfig::split_for_workers`] partitions it into one
//! [`WorkerConfig`] per worker process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Default run time when the document does not set one: 24 hours.
const DEFAULT_RUN_TIME_SECS: u64 = 24 * 3600;

/// Wait-time values below this threshold are treated as zero.
const MIN_MEANINGFUL_WAIT: f64 = 0.001;

/// Whole-run configuration
///
/// Describes the total virtual-client population, how fast it ramps up, how
/// long the run lasts and how requests are spaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Target host passed verbatim to every client instance
    pub host: String,

    /// Total virtual-client population across all workers
    pub users: usize,

    /// Maximum clients hatched per second (whole run; divided per worker)
    pub hatch_rate: usize,

    /// Run duration in seconds
    pub run_time_secs: u64,

    /// Lower bound of the inter-request wait, in seconds
    pub min_wait: f64,

    /// Upper bound of the inter-request wait, in seconds
    pub max_wait: f64,

    /// Number of worker processes
    pub workers: usize,

    /// Name of the registered client factory to drive
    pub client: String,

    /// Whether to emit the live RPS feed
    pub enable_dash: bool,

    /// Opaque configuration forwarded to the client factory's global init
    pub custom: Option<serde_json::Value>,
}

impl BenchConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a configuration from a YAML document.
    ///
    /// Defaulting rules: `hatch_rate` of 0, absent, or greater than `users`
    /// becomes `users`; `run_time` defaults to 86400; `wait_time` defaults
    /// to 0 and accepts a scalar or a `"min-max"` range; `worker` defaults
    /// to 1. Every key not consumed here is collected verbatim into
    /// [`BenchConfig::custom`].
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
        let map = doc
            .as_mapping()
            .ok_or_else(|| ConfigError::invalid("document must be a mapping"))?;

        let host = match map.get("host").and_then(|v| v.as_str()) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => {
                return Err(ConfigError::invalid(
                    "\"host\" must be set with string type",
                ))
            }
        };

        let users = match map.get("users").and_then(|v| v.as_u64()) {
            Some(u) if u > 0 => u as usize,
            _ => return Err(ConfigError::invalid("\"users\" need > 0")),
        };

        let hatch_rate = match map.get("hatch_rate") {
            None => users,
            Some(v) => match v.as_u64() {
                Some(h) if h == 0 || h as usize > users => users,
                Some(h) => h as usize,
                None => return Err(ConfigError::invalid("\"hatch_rate\" need >= 0")),
            },
        };

        let run_time_secs = match map.get("run_time") {
            None => DEFAULT_RUN_TIME_SECS,
            Some(v) => match v.as_u64() {
                Some(t) if t > 0 => t,
                _ => return Err(ConfigError::invalid("\"run_time\" need >= 1")),
            },
        };

        let (min_wait, max_wait) = match map.get("wait_time") {
            None => (0.0, 0.0),
            Some(v) => parse_wait_time(v)?,
        };

        let workers = match map.get("worker") {
            None => 1,
            Some(v) => match v.as_u64() {
                Some(w) if w >= 1 => w as usize,
                _ => return Err(ConfigError::invalid("\"worker\" need >= 1")),
            },
        };

        let client = match map.get("client").and_then(|v| v.as_str()) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => {
                return Err(ConfigError::invalid(
                    "\"client\" must name a registered client factory",
                ))
            }
        };

        let enable_dash = match map.get("enable_dash") {
            None => false,
            Some(v) => v
                .as_bool()
                .ok_or_else(|| ConfigError::invalid("\"enable_dash\" must be boolean type"))?,
        };

        // Everything else is forwarded verbatim to the client capability.
        const KNOWN_KEYS: [&str; 8] = [
            "host",
            "users",
            "hatch_rate",
            "run_time",
            "wait_time",
            "worker",
            "client",
            "enable_dash",
        ];
        let mut custom = serde_json::Map::new();
        for (key, value) in map {
            let Some(key) = key.as_str() else {
                return Err(ConfigError::invalid("keys must be strings"));
            };
            if KNOWN_KEYS.contains(&key) {
                continue;
            }
            let value = serde_json::to_value(value)
                .map_err(|e| ConfigError::invalid(format!("key {key:?} not representable: {e}")))?;
            custom.insert(key.to_string(), value);
        }
        let custom = if custom.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(custom))
        };

        let config = Self {
            host,
            users,
            hatch_rate,
            run_time_secs,
            min_wait,
            max_wait,
            workers,
            client,
            enable_dash,
            custom,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users < self.workers {
            return Err(ConfigError::invalid(format!(
                "\"users\" ({}) must be >= \"worker\" ({})",
                self.users, self.workers
            )));
        }
        Ok(())
    }

    /// Partition this configuration into one [`WorkerConfig`] per worker.
    ///
    /// Shares sum exactly to `users` and differ by at most 1: the remainder
    /// of `users / workers` is distributed one-each to the lowest-indexed
    /// workers. Every worker receives the same divided hatch rate
    /// `round(hatch_rate / workers)`, clamped to at least 1.
    pub fn split_for_workers(&self) -> Result<Vec<WorkerConfig>, ConfigError> {
        self.validate()?;
        let base = self.users / self.workers;
        let remainder = self.users - base * self.workers;
        let hatch_rate = ((self.hatch_rate as f64 / self.workers as f64).round() as usize).max(1);

        Ok((0..self.workers)
            .map(|index| WorkerConfig {
                index,
                host: self.host.clone(),
                users: if index < remainder { base + 1 } else { base },
                hatch_rate,
                run_time_secs: self.run_time_secs,
                min_wait: self.min_wait,
                max_wait: self.max_wait,
                client: self.client.clone(),
                custom: self.custom.clone(),
            })
            .collect())
    }
}

impl fmt::Display for BenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "host: {}", self.host)?;
        writeln!(f, "users: {}", self.users)?;
        writeln!(f, "hatch_rate: {}", self.hatch_rate)?;
        writeln!(f, "run_time: {}", self.run_time_secs)?;
        writeln!(f, "wait_time: {} - {}", self.min_wait, self.max_wait)?;
        writeln!(f, "worker: {}", self.workers)?;
        writeln!(f, "client: {}", self.client)?;
        writeln!(f, "enable_dash: {}", self.enable_dash)?;
        match &self.custom {
            Some(custom) => write!(f, "custom_config: {custom}"),
            None => write!(f, "custom_config: none"),
        }
    }
}

/// Per-worker slice of a [`BenchConfig`]
///
/// Serialized as JSON and handed to the spawned worker process on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Index of this worker in `0..workers`
    pub index: usize,
    /// Target host
    pub host: String,
    /// This worker's share of the total population
    pub users: usize,
    /// Divided hatch rate (clients per second), at least 1
    pub hatch_rate: usize,
    /// Run duration in seconds
    pub run_time_secs: u64,
    /// Lower bound of the inter-request wait, in seconds
    pub min_wait: f64,
    /// Upper bound of the inter-request wait, in seconds
    pub max_wait: f64,
    /// Name of the client factory to drive
    pub client: String,
    /// Opaque configuration for the client factory's global init
    pub custom: Option<serde_json::Value>,
}

/// Normalize a `wait_time` value: scalar, or a `"min-max"` / `"min~max"` range.
///
/// Values below 1ms collapse to 0. A range whose bounds are inverted or
/// equal collapses to the lower bound on both sides.
fn parse_wait_time(value: &serde_yaml::Value) -> Result<(f64, f64), ConfigError> {
    let err = || ConfigError::invalid("\"wait_time\" format err");

    if let Some(w) = value.as_i64() {
        if w < 0 {
            return Err(err());
        }
        return Ok(normalize_wait(w as f64, w as f64));
    }
    if let Some(w) = value.as_f64() {
        if w < 0.0 {
            return Err(err());
        }
        return Ok(normalize_wait(w, w));
    }
    if let Some(s) = value.as_str() {
        let parts: Vec<&str> = s
            .splitn(2, ['-', '~'])
            .map(|p| p.trim_matches([' ', '\t']))
            .collect();
        match parts.as_slice() {
            [single] => {
                let w: f64 = single.parse().map_err(|_| err())?;
                return Ok(normalize_wait(w, w));
            }
            [min, max] => {
                let min: f64 = min.parse().map_err(|_| err())?;
                let max: f64 = max.parse().map_err(|_| err())?;
                return Ok(normalize_wait(min, max));
            }
            _ => return Err(err()),
        }
    }
    Err(err())
}

fn normalize_wait(min: f64, max: f64) -> (f64, f64) {
    let clamp = |w: f64| if w < MIN_MEANINGFUL_WAIT { 0.0 } else { w };
    if min < max {
        (clamp(min), clamp(max))
    } else {
        let min = clamp(min);
        (min, min)
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is missing a key or a value is out of range
    #[error("config err: {0}")]
    Invalid(String),

    /// The configuration file could not be read
    #[error("config err: failed to read {path}: {source}")]
    Io {
        /// Path to the configuration file
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML
    #[error("config err: invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra: &str) -> String {
        format!("host: http://localhost:8080\nusers: 10\nclient: noop\n{extra}")
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = BenchConfig::from_yaml_str(&minimal("")).unwrap();
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.users, 10);
        assert_eq!(config.hatch_rate, 10); // defaults to users
        assert_eq!(config.run_time_secs, 86400);
        assert_eq!(config.min_wait, 0.0);
        assert_eq!(config.max_wait, 0.0);
        assert_eq!(config.workers, 1);
        assert!(!config.enable_dash);
        assert!(config.custom.is_none());
    }

    #[test]
    fn test_missing_host_rejected() {
        let result = BenchConfig::from_yaml_str("users: 10\nclient: noop\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_client_rejected() {
        let result = BenchConfig::from_yaml_str("host: h\nusers: 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_hatch_rate_zero_becomes_users() {
        let config = BenchConfig::from_yaml_str(&minimal("hatch_rate: 0\n")).unwrap();
        assert_eq!(config.hatch_rate, 10);
    }

    #[test]
    fn test_hatch_rate_above_users_becomes_users() {
        let config = BenchConfig::from_yaml_str(&minimal("hatch_rate: 100\n")).unwrap();
        assert_eq!(config.hatch_rate, 10);
    }

    #[test]
    fn test_wait_time_scalar() {
        let config = BenchConfig::from_yaml_str(&minimal("wait_time: 2\n")).unwrap();
        assert_eq!((config.min_wait, config.max_wait), (2.0, 2.0));
    }

    #[test]
    fn test_wait_time_range() {
        let config = BenchConfig::from_yaml_str(&minimal("wait_time: 0.5 - 1.5\n")).unwrap();
        assert_eq!((config.min_wait, config.max_wait), (0.5, 1.5));
    }

    #[test]
    fn test_wait_time_tilde_range() {
        let config = BenchConfig::from_yaml_str(&minimal("wait_time: \"1 ~ 3\"\n")).unwrap();
        assert_eq!((config.min_wait, config.max_wait), (1.0, 3.0));
    }

    #[test]
    fn test_wait_time_sub_millisecond_collapses_to_zero() {
        let config = BenchConfig::from_yaml_str(&minimal("wait_time: 0.0001\n")).unwrap();
        assert_eq!((config.min_wait, config.max_wait), (0.0, 0.0));
    }

    #[test]
    fn test_wait_time_inverted_range_collapses_to_min() {
        let config = BenchConfig::from_yaml_str(&minimal("wait_time: 3.0 - 1.0\n")).unwrap();
        assert_eq!((config.min_wait, config.max_wait), (3.0, 3.0));
    }

    #[test]
    fn test_wait_time_garbage_rejected() {
        assert!(BenchConfig::from_yaml_str(&minimal("wait_time: fast\n")).is_err());
    }

    #[test]
    fn test_custom_keys_collected() {
        let config =
            BenchConfig::from_yaml_str(&minimal("test_data_file: body.json\nretries: 3\n"))
                .unwrap();
        let custom = config.custom.expect("custom config");
        assert_eq!(custom["test_data_file"], "body.json");
        assert_eq!(custom["retries"], 3);
    }

    #[test]
    fn test_users_below_workers_rejected() {
        let result = BenchConfig::from_yaml_str(&minimal("worker: 20\n"));
        assert!(result.is_err());
    }

    #[test]
    fn test_split_shares_sum_to_users() {
        for (users, workers) in [(10usize, 3usize), (5, 2), (7, 7), (100, 8), (9, 4)] {
            let mut config = BenchConfig::from_yaml_str(&minimal("")).unwrap();
            config.users = users;
            config.workers = workers;
            let shares = config.split_for_workers().unwrap();
            assert_eq!(shares.len(), workers);
            assert_eq!(shares.iter().map(|w| w.users).sum::<usize>(), users);
            let max = shares.iter().map(|w| w.users).max().unwrap();
            let min = shares.iter().map(|w| w.users).min().unwrap();
            assert!(max - min <= 1, "{users}/{workers}: shares differ by > 1");
        }
    }

    #[test]
    fn test_split_remainder_goes_to_first_workers() {
        let mut config = BenchConfig::from_yaml_str(&minimal("")).unwrap();
        config.users = 5;
        config.workers = 2;
        let shares = config.split_for_workers().unwrap();
        assert_eq!(shares[0].users, 3);
        assert_eq!(shares[1].users, 2);
    }

    #[test]
    fn test_split_hatch_rate_at_least_one() {
        let mut config = BenchConfig::from_yaml_str(&minimal("")).unwrap();
        config.users = 8;
        config.workers = 8;
        config.hatch_rate = 2; // 2 / 8 rounds to 0, must clamp to 1
        let shares = config.split_for_workers().unwrap();
        assert!(shares.iter().all(|w| w.hatch_rate == 1));
    }

    #[test]
    fn test_split_divides_hatch_rate() {
        let mut config = BenchConfig::from_yaml_str(&minimal("")).unwrap();
        config.users = 100;
        config.hatch_rate = 10;
        config.workers = 5;
        let shares = config.split_for_workers().unwrap();
        assert!(shares.iter().all(|w| w.hatch_rate == 2));
    }

    #[test]
    fn test_worker_config_roundtrip() {
        let mut config = BenchConfig::from_yaml_str(&minimal("token: abc\n")).unwrap();
        config.workers = 2;
        let shares = config.split_for_workers().unwrap();
        let json = serde_json::to_string(&shares[1]).unwrap();
        let back: WorkerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 1);
        assert_eq!(back.users, shares[1].users);
        assert_eq!(back.custom.unwrap()["token"], "abc");
    }
}
