use crate::simulation::config::Tracker;
use crate::simulation::telemetry::schema::TelemetrySchema;
use crate::simulation::telemetry::sender::MessageSender;
use crate::simulation::telemetry::{TrackingData, VehicleTrackingMessage, now_millis};
use crate::simulation::vehicles::navigation::NavigationManager;
use crate::simulation::vehicles::tasks::TasksManager;
use rand::Rng;
use rand::rngs::SmallRng;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerStatus {
    #[default]
    Online,
    Offline,
}

/// What happened to the tracking message of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Transmission {
    Sent,
    /// The message did not pass the schema and was dropped.
    Rejected(String),
    /// The sender could not deliver the message.
    Failed(String),
    /// The tracker had no connection, nothing was sent.
    Offline,
}

/// Collects the telemetry of a vehicle and sends it. Also simulates connection loss.
pub trait TrackerManager: Debug + Send {
    fn vehicle_id(&self) -> Uuid;
    fn current_status(&self) -> TrackerStatus;
    /// Draws a new connection status.
    fn update(&mut self);
    fn collect_tracking_data(
        &self,
        tasks: &dyn TasksManager,
        navigation: &dyn NavigationManager,
    ) -> TrackingData;
    fn send_tracking_data(
        &mut self,
        tasks: &dyn TasksManager,
        navigation: &dyn NavigationManager,
    ) -> Transmission;
}

#[derive(Debug)]
pub struct BasicTrackerManager {
    vehicle_id: Uuid,
    params: Tracker,
    current_status: TrackerStatus,
    schema: Arc<dyn TelemetrySchema>,
    sender: Arc<dyn MessageSender>,
    rnd: SmallRng,
}

impl BasicTrackerManager {
    pub fn new(
        vehicle_id: Uuid,
        params: Tracker,
        schema: Arc<dyn TelemetrySchema>,
        sender: Arc<dyn MessageSender>,
        rnd: SmallRng,
    ) -> Self {
        Self {
            vehicle_id,
            params,
            current_status: TrackerStatus::Online,
            schema,
            sender,
            rnd,
        }
    }

    fn generate_status(&mut self) -> TrackerStatus {
        let total = self.params.online_probability + self.params.offline_probability;
        if self.rnd.random::<f64>() * total < self.params.online_probability {
            TrackerStatus::Online
        } else {
            TrackerStatus::Offline
        }
    }
}

impl TrackerManager for BasicTrackerManager {
    fn vehicle_id(&self) -> Uuid {
        self.vehicle_id
    }

    fn current_status(&self) -> TrackerStatus {
        self.current_status
    }

    fn update(&mut self) {
        self.current_status = self.generate_status();
    }

    fn collect_tracking_data(
        &self,
        tasks: &dyn TasksManager,
        navigation: &dyn NavigationManager,
    ) -> TrackingData {
        TrackingData {
            task_state: tasks.task_state(),
            vehicle_location: navigation.current_location(),
            destination: navigation.destination(),
            vehicle_speed: navigation.current_speed(),
            heading_direction: navigation.current_direction(),
            distance_to_destination: navigation.distance_to_destination(),
            out_of_zone_status: navigation.out_of_zone(),
            created_time: now_millis(),
        }
    }

    fn send_tracking_data(
        &mut self,
        tasks: &dyn TasksManager,
        navigation: &dyn NavigationManager,
    ) -> Transmission {
        if self.current_status == TrackerStatus::Offline {
            debug!("Tracker is offline, dropping tracking data");
            return Transmission::Offline;
        }

        let data = self.collect_tracking_data(tasks, navigation);
        let message = VehicleTrackingMessage::new(self.vehicle_id, data);
        if let Err(e) = self.schema.validate(&message) {
            warn!("Tracking message rejected: {e}");
            return Transmission::Rejected(e.to_string());
        }

        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!("Tracking message can't be serialized: {e}");
                return Transmission::Failed(e.to_string());
            }
        };

        match self.sender.send(json) {
            Ok(()) => Transmission::Sent,
            Err(e) => {
                warn!("Failed to send tracking message: {e}");
                Transmission::Failed(e.to_string())
            }
        }
    }
}
