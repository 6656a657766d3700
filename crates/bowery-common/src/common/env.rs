//! Environment parsing helpers shared by the configuration layers.

use std::env;
use std::str::FromStr;

use tracing::warn;

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}

pub fn parse_env_u16(key: &str, default: u16) -> u16 {
    parse_env(key, default)
}

pub fn parse_env_u32(key: &str, default: u32) -> u32 {
    parse_env(key, default)
}

pub fn parse_env_u64(key: &str, default: u64) -> u64 {
    parse_env(key, default)
}

/// Accepts `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_env_bool(key: &str, default: bool) -> bool {
    let Ok(value) = env::var(key) else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(value = %value, key, "Invalid boolean config; using default");
            default
        }
    }
}
