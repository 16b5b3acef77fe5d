//! Link configuration.
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "vehicle_type": "firefly",
//!   "command_timeout_ticks": 100,
//!   "schedule": [{ "id": 260, "divisor": 0 }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use uavcom_frame::{FrameConfig, HEADER_SIZE};

use crate::error::{LinkError, Result};
use crate::messages::{GpsData, Message, RateDivisor};
use crate::scheduler::DEFAULT_DIVISORS;
use crate::vehicle::VehicleType;
use crate::watchdog::DEFAULT_COMMAND_TIMEOUT_TICKS;

/// Largest message size a configuration may set.
pub const MAX_CONFIG_MESSAGE_SIZE: usize = 4096;

/// Start-up divisor for one telemetry message.
pub type ScheduleOverride = RateDivisor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub frame: FrameConfig,
    /// Ticks without a control command before the link drops to `Off`.
    pub command_timeout_ticks: u16,
    /// Thrust in newtons at full command scale. Defaults to the vehicle
    /// type's rating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_thrust_newtons: Option<f32>,
    pub vehicle_type: VehicleType,
    /// Divisor overrides applied on top of the default schedule.
    pub schedule: Vec<ScheduleOverride>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            command_timeout_ticks: DEFAULT_COMMAND_TIMEOUT_TICKS,
            max_thrust_newtons: None,
            vehicle_type: VehicleType::default(),
            schedule: Vec::new(),
        }
    }
}

impl LinkConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective max thrust.
    pub fn max_thrust(&self) -> f32 {
        self.max_thrust_newtons
            .unwrap_or_else(|| self.vehicle_type.max_thrust_newtons())
    }

    pub fn validate(&self) -> Result<()> {
        let size = self.frame.max_message_size;
        let min = HEADER_SIZE + GpsData::SIZE;
        if size < min {
            return Err(LinkError::Config(format!(
                "max_message_size {size} cannot carry the largest telemetry message ({min} bytes)"
            )));
        }
        if size > MAX_CONFIG_MESSAGE_SIZE {
            return Err(LinkError::Config(format!(
                "max_message_size {size} exceeds {MAX_CONFIG_MESSAGE_SIZE}"
            )));
        }

        if self.command_timeout_ticks == 0 {
            return Err(LinkError::Config(
                "command_timeout_ticks must be greater than zero".to_string(),
            ));
        }

        if let Some(thrust) = self.max_thrust_newtons {
            if !(thrust.is_finite() && thrust > 0.0) {
                return Err(LinkError::Config(format!(
                    "max_thrust_newtons must be positive (got {thrust})"
                )));
            }
        }

        for entry in &self.schedule {
            if !DEFAULT_DIVISORS.iter().any(|(id, _)| *id == entry.id) {
                return Err(LinkError::Config(format!(
                    "schedule entry for unknown telemetry id {:#x}",
                    entry.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ids;

    #[test]
    fn empty_json_gives_defaults() {
        let config = LinkConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.frame.max_message_size, 128);
        assert_eq!(config.command_timeout_ticks, 200);
        assert_eq!(config.max_thrust(), 20.0);
    }

    #[test]
    fn vehicle_type_sets_thrust_default() {
        let config = LinkConfig::from_json_str(r#"{"vehicle_type":"pelican"}"#).unwrap();
        assert_eq!(config.max_thrust(), 36.0);

        let explicit =
            LinkConfig::from_json_str(r#"{"vehicle_type":"pelican","max_thrust_newtons":30.0}"#)
                .unwrap();
        assert_eq!(explicit.max_thrust(), 30.0);
    }

    #[test]
    fn schedule_overrides_parse() {
        let json = format!(r#"{{"schedule":[{{"id":{},"divisor":0}}]}}"#, ids::GPS_DATA);
        let config = LinkConfig::from_json_str(&json).unwrap();
        assert_eq!(
            config.schedule,
            vec![ScheduleOverride {
                id: ids::GPS_DATA,
                divisor: 0
            }]
        );
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{"command_timeout_ticks":0}"#,
            r#"{"max_thrust_newtons":0.0}"#,
            r#"{"max_thrust_newtons":-3.0}"#,
            r#"{"frame":{"max_message_size":16}}"#,
            r#"{"frame":{"max_message_size":5000}}"#,
            r#"{"schedule":[{"id":1,"divisor":5}]}"#,
        ] {
            let err = LinkConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, LinkError::Config(_)), "{json}: {err}");
        }
    }

    #[test]
    fn malformed_json_is_json_error() {
        let err = LinkConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, LinkError::Json(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = std::env::temp_dir().join(format!("uavcom-link-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("link.json");
        std::fs::write(&path, r#"{"vehicle_type":"firefly","command_timeout_ticks":50}"#).unwrap();

        let config = LinkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.vehicle_type, VehicleType::Firefly);
        assert_eq!(config.command_timeout_ticks, 50);

        let missing = LinkConfig::from_json_file(dir.join("missing.json")).unwrap_err();
        assert!(matches!(missing, LinkError::Io(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
