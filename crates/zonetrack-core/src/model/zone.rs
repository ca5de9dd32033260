// ── Zone domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zonetrack_wire::{LinkState, ZoneEndpoint};

use crate::error::CoreError;

/// Display color for a zone, stored as RGB and written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for DisplayColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::ValidationFailed {
            message: format!("invalid color '{s}' (expected #RRGGBB)"),
        };
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|part| u8::from_str_radix(part, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for DisplayColor {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayColor> for String {
    fn from(color: DisplayColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Static description of one zone. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    /// 1..=8, also the display and sort key.
    pub ordinal: u8,
    /// Physical controller hosting the reader, e.g. `pr-rpi001`.
    pub controller_id: String,
    pub host: String,
    pub port: u16,
    pub color: DisplayColor,
}

impl ZoneConfig {
    pub fn endpoint(&self) -> ZoneEndpoint {
        ZoneEndpoint {
            name: self.name.clone(),
            ordinal: self.ordinal,
            host: self.host.clone(),
            port: self.port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Live status row for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStatus {
    #[serde(flatten)]
    pub zone: ZoneConfig,
    pub state: LinkState,
    pub tag_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
    pub last_tag: Option<String>,
    pub last_error: Option<String>,
}

impl ZoneStatus {
    pub fn new(zone: ZoneConfig) -> Self {
        Self {
            zone,
            state: LinkState::Disconnected,
            tag_count: 0,
            last_activity: None,
            last_tag: None,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Operator-facing status text.
    pub fn status_text(&self) -> String {
        match (self.state, self.last_error.as_deref()) {
            (LinkState::Listening, _) => "Listening".into(),
            (LinkState::Connecting, _) => "Connecting...".into(),
            (LinkState::Reconnecting, _) => "Error - Reconnecting...".into(),
            (LinkState::Disconnected, Some(err)) => format!("Failed: {err}"),
            (LinkState::Disconnected, None) => "Disconnected".into(),
        }
    }
}

/// Aggregate health across all zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    #[strum(serialize = "All Online")]
    AllOnline,
    #[strum(serialize = "Partial Connection")]
    Partial,
    #[strum(serialize = "All Zones Offline")]
    Offline,
}

impl ConnectionHealth {
    pub fn from_counts(connected: usize, total: usize) -> Self {
        if total > 0 && connected == total {
            Self::AllOnline
        } else if connected > 0 {
            Self::Partial
        } else {
            Self::Offline
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_and_display() {
        let color: DisplayColor = "#add8e6".parse().unwrap();
        assert_eq!(color, DisplayColor::rgb(0xAD, 0xD8, 0xE6));
        assert_eq!(color.to_string(), "#ADD8E6");
    }

    #[test]
    fn color_rejects_malformed() {
        for bad in ["ADD8E6", "#ADD8E", "#GGGGGG", "#ADD8E6FF", ""] {
            assert!(bad.parse::<DisplayColor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn color_serde_as_string() {
        let json = serde_json::to_string(&DisplayColor::rgb(0xF0, 0x80, 0x80)).unwrap();
        assert_eq!(json, "\"#F08080\"");
        let back: DisplayColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DisplayColor::rgb(0xF0, 0x80, 0x80));
    }

    #[test]
    fn health_from_counts() {
        assert_eq!(ConnectionHealth::from_counts(8, 8), ConnectionHealth::AllOnline);
        assert_eq!(ConnectionHealth::from_counts(3, 8), ConnectionHealth::Partial);
        assert_eq!(ConnectionHealth::from_counts(0, 8), ConnectionHealth::Offline);
        assert_eq!(ConnectionHealth::from_counts(0, 0), ConnectionHealth::Offline);
    }

    #[test]
    fn status_text_reports_failure() {
        let mut status = ZoneStatus::new(ZoneConfig {
            name: "Bathing".into(),
            ordinal: 1,
            controller_id: "pr-rpi001".into(),
            host: "192.168.1.201".into(),
            port: 5001,
            color: DisplayColor::rgb(0xAD, 0xD8, 0xE6),
        });
        assert_eq!(status.status_text(), "Disconnected");
        status.last_error = Some("refused".into());
        assert_eq!(status.status_text(), "Failed: refused");
        status.state = LinkState::Reconnecting;
        assert_eq!(status.status_text(), "Error - Reconnecting...");
    }
}
