// ── Monitor configuration ──
//
// Runtime configuration handed to the monitor at construction. The core
// never reads files or environment; zonetrack-config builds this.

use std::collections::HashSet;
use std::time::Duration;

use zonetrack_wire::ReconnectPolicy;

use crate::error::CoreError;
use crate::model::ZoneConfig;

/// Highest zone ordinal a site can have.
pub const MAX_ZONE_ORDINAL: u8 = 8;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub zones: Vec<ZoneConfig>,
    /// Reconnect timings shared by every zone link.
    pub link: ReconnectPolicy,
    /// Upper bound on a single directory call (log or lookup).
    pub store_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            link: ReconnectPolicy::default(),
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl MonitorConfig {
    pub fn new(zones: Vec<ZoneConfig>) -> Self {
        Self {
            zones,
            ..Self::default()
        }
    }

    /// Check zone table invariants: at least one zone, ordinals in
    /// `1..=8` and unique, names non-empty and unique, ports non-zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.zones.is_empty() {
            return Err(invalid("at least one zone must be configured"));
        }

        let mut names = HashSet::new();
        let mut ordinals = HashSet::new();
        for zone in &self.zones {
            if zone.name.trim().is_empty() {
                return Err(invalid(format!("zone {} has an empty name", zone.ordinal)));
            }
            if !(1..=MAX_ZONE_ORDINAL).contains(&zone.ordinal) {
                return Err(invalid(format!(
                    "zone '{}' has ordinal {} (expected 1..={MAX_ZONE_ORDINAL})",
                    zone.name, zone.ordinal
                )));
            }
            if zone.port == 0 {
                return Err(invalid(format!("zone '{}' has port 0", zone.name)));
            }
            if zone.host.trim().is_empty() {
                return Err(invalid(format!("zone '{}' has an empty host", zone.name)));
            }
            if !names.insert(zone.name.as_str()) {
                return Err(invalid(format!("duplicate zone name '{}'", zone.name)));
            }
            if !ordinals.insert(zone.ordinal) {
                return Err(invalid(format!("duplicate zone ordinal {}", zone.ordinal)));
            }
        }

        if self.store_timeout.is_zero() {
            return Err(invalid("store timeout must be non-zero"));
        }
        if self.link.connect_timeout.is_zero() {
            return Err(invalid("connect timeout must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::ValidationFailed {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DisplayColor;

    fn zone(name: &str, ordinal: u8, port: u16) -> ZoneConfig {
        ZoneConfig {
            name: name.into(),
            ordinal,
            controller_id: "pr-rpi001".into(),
            host: "127.0.0.1".into(),
            port,
            color: DisplayColor::rgb(0, 0, 0),
        }
    }

    #[test]
    fn accepts_distinct_zones() {
        let config = MonitorConfig::new(vec![zone("Bathing", 1, 5001), zone("Drying", 2, 5002)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_table() {
        assert!(MonitorConfig::default().validate().is_err());
    }

    #[test]
    fn rejects_duplicates_and_ranges() {
        let cases = [
            vec![zone("A", 1, 5001), zone("A", 2, 5002)],
            vec![zone("A", 1, 5001), zone("B", 1, 5002)],
            vec![zone("A", 0, 5001)],
            vec![zone("A", 9, 5001)],
            vec![zone("A", 1, 0)],
            vec![zone("  ", 1, 5001)],
        ];
        for zones in cases {
            let config = MonitorConfig::new(zones.clone());
            assert!(config.validate().is_err(), "{zones:?} should be rejected");
        }
    }

    #[test]
    fn shared_controller_is_fine() {
        let config = MonitorConfig::new(vec![zone("A", 1, 5001), zone("B", 2, 5001)]);
        assert!(config.validate().is_ok());
    }
}
