use crate::simulation::geometry::Location;
use crate::simulation::map::NavigationMap;
use crate::simulation::telemetry::{SCHEMA_VERSION, VehicleTrackingMessage};
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unsupported schema version '{0}', expected 1.0.0")]
    UnsupportedVersion(String),
    #[error("{field} {location} is out of the accepted range")]
    LocationOutOfRange {
        field: &'static str,
        location: Location,
    },
    #[error("vehicle speed must not be negative, got {0}")]
    NegativeSpeed(i64),
    #[error("distance to destination must be a finite non-negative number, got {0}")]
    InvalidDistance(f64),
    #[error("created time {created_time} lies in the future (now {now})")]
    FutureTimestamp {
        created_time: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("malformed tracking message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Validates tracking messages before they leave the vehicle.
pub trait TelemetrySchema: Debug + Send + Sync {
    fn validate(&self, message: &VehicleTrackingMessage) -> Result<(), SchemaError>;

    /// Parses a serialized message, unknown fields are rejected, and validates it.
    fn validate_json(&self, json: &str) -> Result<VehicleTrackingMessage, SchemaError> {
        let message: VehicleTrackingMessage = serde_json::from_str(json)?;
        self.validate(&message)?;
        Ok(message)
    }
}

/// Version 1.0.0 of the tracking message schema. Locations may lie up to one map size outside of
/// the map, so vehicles that left the zone are still reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleTrackingSchemaV1 {
    x_range: RangeInclusive<i64>,
    y_range: RangeInclusive<i64>,
}

impl VehicleTrackingSchemaV1 {
    pub fn for_map(map: &NavigationMap) -> Self {
        VehicleTrackingSchemaV1 {
            x_range: -map.x_size()..=2 * map.x_size(),
            y_range: -map.y_size()..=2 * map.y_size(),
        }
    }

    fn check_location(&self, field: &'static str, location: Location) -> Result<(), SchemaError> {
        if self.x_range.contains(&location.x) && self.y_range.contains(&location.y) {
            Ok(())
        } else {
            Err(SchemaError::LocationOutOfRange { field, location })
        }
    }
}

impl TelemetrySchema for VehicleTrackingSchemaV1 {
    fn validate(&self, message: &VehicleTrackingMessage) -> Result<(), SchemaError> {
        if message.schema_version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion(
                message.schema_version.clone(),
            ));
        }
        self.check_location("vehicle_location", message.vehicle_location)?;
        self.check_location("destination", message.destination)?;

        if message.vehicle_speed < 0 {
            return Err(SchemaError::NegativeSpeed(message.vehicle_speed));
        }
        let distance = message.distance_to_destination;
        if !distance.is_finite() || distance < 0. {
            return Err(SchemaError::InvalidDistance(distance));
        }

        let now = Utc::now();
        if message.created_time > now {
            return Err(SchemaError::FutureTimestamp {
                created_time: message.created_time,
                now,
            });
        }
        Ok(())
    }
}
