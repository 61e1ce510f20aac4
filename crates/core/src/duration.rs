// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing for humane duration strings in timeout fields.

use crate::validate::ConfigError;
use std::time::Duration;

/// Parse a duration string as used by `timeout` fields.
///
/// Accepts `"250ms"`, `"30s"`, `"5m"`, `"1h"`, and a bare integer, which is
/// read as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let err = || ConfigError::InvalidDuration {
        value: value.to_string(),
    };

    if value.is_empty() {
        return Err(err());
    }

    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => value.split_at(idx),
        None => (value, "s"),
    };
    let amount: u64 = digits.parse().map_err(|_| err())?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        "h" => Ok(Duration::from_secs(amount * 3600)),
        _ => Err(err()),
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
