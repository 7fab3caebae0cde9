// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname reported in the syslog header of log entries.

use std::env;
use tracing::warn;

pub const HOSTNAME_OVERRIDE_ENV: &str = "LOGENGINE_HOSTNAME";

const UNKNOWN_HOSTNAME: &str = "unknown";

/// Resolves the hostname, first match wins:
/// 1. `LOGENGINE_HOSTNAME`
/// 2. `HOSTNAME`
/// 3. `gethostname(2)`
/// 4. `"unknown"`
///
/// Empty values are skipped.
#[must_use]
pub fn get_hostname() -> String {
    for var in [HOSTNAME_OVERRIDE_ENV, "HOSTNAME"] {
        if let Ok(hostname) = env::var(var) {
            if !hostname.is_empty() {
                return hostname;
            }
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname) => match hostname.into_string() {
            Ok(hostname) if !hostname.is_empty() => return hostname,
            Ok(_) => {}
            Err(raw) => warn!("System hostname {raw:?} is not valid UTF-8"),
        },
        Err(e) => warn!("Failed to get system hostname: {e}"),
    }

    warn!("Could not determine hostname, using '{UNKNOWN_HOSTNAME}'");
    UNKNOWN_HOSTNAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_hostname_not_empty() {
        env::remove_var(HOSTNAME_OVERRIDE_ENV);
        assert!(!get_hostname().is_empty());
    }

    #[test]
    #[serial]
    fn test_override_wins_over_hostname() {
        env::set_var(HOSTNAME_OVERRIDE_ENV, "test-hostname-override");
        env::set_var("HOSTNAME", "from-shell");
        assert_eq!(get_hostname(), "test-hostname-override");
        env::remove_var(HOSTNAME_OVERRIDE_ENV);
        env::remove_var("HOSTNAME");
    }

    #[test]
    #[serial]
    fn test_empty_override_is_skipped() {
        env::set_var(HOSTNAME_OVERRIDE_ENV, "");
        env::set_var("HOSTNAME", "from-shell");
        assert_eq!(get_hostname(), "from-shell");
        env::remove_var(HOSTNAME_OVERRIDE_ENV);
        env::remove_var("HOSTNAME");
    }
}
