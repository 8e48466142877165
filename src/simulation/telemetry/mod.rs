use crate::simulation::geometry::{Direction, Location};
use crate::simulation::vehicles::tasks::TaskState;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod schema;
pub mod sender;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Snapshot of everything a vehicle reports in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingData {
    pub task_state: TaskState,
    pub vehicle_location: Location,
    pub destination: Location,
    pub vehicle_speed: i64,
    pub heading_direction: Direction,
    pub distance_to_destination: f64,
    pub out_of_zone_status: bool,
    #[serde(with = "millis_timestamp")]
    pub created_time: DateTime<Utc>,
}

/// The current time, cut to the millisecond precision of the wire format.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// Tracking message as it goes over the wire, version 1.0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleTrackingMessage {
    pub schema_version: String,
    pub vehicle_id: Uuid,
    pub task_state: TaskState,
    pub vehicle_location: Location,
    pub destination: Location,
    pub vehicle_speed: i64,
    pub heading_direction: Direction,
    pub distance_to_destination: f64,
    pub out_of_zone_status: bool,
    #[serde(with = "millis_timestamp")]
    pub created_time: DateTime<Utc>,
}

impl VehicleTrackingMessage {
    pub fn new(vehicle_id: Uuid, data: TrackingData) -> Self {
        VehicleTrackingMessage {
            schema_version: SCHEMA_VERSION.to_string(),
            vehicle_id,
            task_state: data.task_state,
            vehicle_location: data.vehicle_location,
            destination: data.destination,
            vehicle_speed: data.vehicle_speed,
            heading_direction: data.heading_direction,
            distance_to_destination: data.distance_to_destination,
            out_of_zone_status: data.out_of_zone_status,
            created_time: data.created_time,
        }
    }
}

/// RFC 3339 with milliseconds and an explicit UTC offset, e.g. `2024-05-01T12:00:00.123+00:00`.
mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
