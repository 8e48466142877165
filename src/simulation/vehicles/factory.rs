use crate::simulation::config::{Config, Movement, Navigation, Tasks, Tracker};
use crate::simulation::geometry::Location;
use crate::simulation::map::{MAX_MAP_SIZE, NavigationMap};
use crate::simulation::random::get_rnd;
use crate::simulation::telemetry::schema::TelemetrySchema;
use crate::simulation::telemetry::sender::MessageSender;
use crate::simulation::vehicles::destination::BasicDestinationTracker;
use crate::simulation::vehicles::heading::{
    DestinationHeading, HeadingDirectionManager, ZoneReturnHeading,
};
use crate::simulation::vehicles::location::BasicLocationService;
use crate::simulation::vehicles::movement::BasicMovementManager;
use crate::simulation::vehicles::navigation::BasicNavigationManager;
use crate::simulation::vehicles::tasks::BasicTasksManager;
use crate::simulation::vehicles::tracker::BasicTrackerManager;
use crate::simulation::vehicles::vehicle::{Vehicle, VehicleError};
use crate::simulation::vehicles::zone::BasicAllowedZoneManager;
use derive_builder::Builder;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_INITIAL_LOCATION: Location = Location { x: 1, y: 1 };
pub const DESTINATION_PROVIDER: &str = "destination";
pub const ZONE_RETURN_PROVIDER: &str = "zone_return";

/// Per vehicle deviations from the config. Unset options fall back to the config values.
#[derive(Debug, Clone, Default, PartialEq, Builder)]
#[builder(default, setter(strip_option))]
pub struct VehicleOptions {
    pub initial_location: Option<Location>,
    pub max_speed: Option<i64>,
    pub task_fail_probability: Option<f64>,
    pub vehicle_id: Option<Uuid>,
}

/// Wires up vehicles from a validated config. Every vehicle gets its own random streams,
/// derived from the base seed and its index.
#[derive(Debug, Clone)]
pub struct VehicleFactory {
    random_seed: u64,
    movement: Movement,
    navigation: Navigation,
    tasks: Tasks,
    tracker: Tracker,
    nav_map: Arc<NavigationMap>,
    schema: Arc<dyn TelemetrySchema>,
    sender: Arc<dyn MessageSender>,
}

impl VehicleFactory {
    pub fn from_config(
        config: &Config,
        nav_map: Arc<NavigationMap>,
        schema: Arc<dyn TelemetrySchema>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        VehicleFactory {
            random_seed: config.simulation().random_seed,
            movement: config.movement(),
            navigation: config.navigation(),
            tasks: config.tasks(),
            tracker: config.tracker(),
            nav_map,
            schema,
            sender,
        }
    }

    pub fn nav_map(&self) -> &Arc<NavigationMap> {
        &self.nav_map
    }

    pub fn create_vehicle(
        &self,
        index: usize,
        options: VehicleOptions,
    ) -> Result<Vehicle, VehicleError> {
        let navigation = self.create_navigation_manager(index, &options)?;
        let tasks = self.create_tasks_manager(index, &options)?;
        let tracker = self.create_tracker_manager(index, &options);
        Ok(Vehicle::new(
            Box::new(navigation),
            Box::new(tasks),
            Box::new(tracker),
        ))
    }

    /// Creates `count` vehicles with default options.
    pub fn create_fleet(&self, count: usize) -> Result<Vec<Vehicle>, VehicleError> {
        let vehicles = (0..count)
            .map(|index| self.create_vehicle(index, VehicleOptions::default()))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Created fleet of {} vehicles", vehicles.len());
        Ok(vehicles)
    }

    pub fn create_navigation_manager(
        &self,
        index: usize,
        options: &VehicleOptions,
    ) -> Result<BasicNavigationManager, VehicleError> {
        let mut movement = self.movement;
        if let Some(max_speed) = options.max_speed {
            if !(1..=MAX_MAP_SIZE).contains(&max_speed) {
                return Err(VehicleError::InvalidOption {
                    option: "max_speed",
                    reason: format!("must be within [1, {MAX_MAP_SIZE}], got {max_speed}"),
                });
            }
            movement.max_speed = max_speed;
        }

        let initial_location = options.initial_location.unwrap_or(DEFAULT_INITIAL_LOCATION);
        let seed = self.random_seed;

        let mut heading = HeadingDirectionManager::new(get_rnd(seed, (index, "heading")));
        heading.register_heading_provider(
            DESTINATION_PROVIDER,
            Box::new(DestinationHeading),
            self.navigation.destination_weight,
        )?;
        if let Some(weight) = self.navigation.zone_return_weight {
            heading.register_heading_provider(
                ZONE_RETURN_PROVIDER,
                Box::new(ZoneReturnHeading),
                weight,
            )?;
        }

        Ok(BasicNavigationManager::new(
            Box::new(BasicLocationService::new(
                self.nav_map.clone(),
                initial_location,
            )),
            Box::new(BasicMovementManager::new(
                movement,
                get_rnd(seed, (index, "movement")),
            )),
            Box::new(BasicDestinationTracker::new(
                self.navigation.destination_reached_threshold,
            )),
            Box::new(BasicAllowedZoneManager::new()),
            heading,
        ))
    }

    pub fn create_tasks_manager(
        &self,
        index: usize,
        options: &VehicleOptions,
    ) -> Result<BasicTasksManager, VehicleError> {
        let fail_probability = options
            .task_fail_probability
            .unwrap_or(self.tasks.fail_probability);
        if !(0.0..=1.0).contains(&fail_probability) {
            return Err(VehicleError::InvalidOption {
                option: "task_fail_probability",
                reason: format!("must be within [0, 1], got {fail_probability}"),
            });
        }
        Ok(BasicTasksManager::new(
            self.nav_map.clone(),
            fail_probability,
            get_rnd(self.random_seed, (index, "tasks")),
        ))
    }

    pub fn create_tracker_manager(
        &self,
        index: usize,
        options: &VehicleOptions,
    ) -> BasicTrackerManager {
        BasicTrackerManager::new(
            options.vehicle_id.unwrap_or_else(Uuid::new_v4),
            self.tracker,
            self.schema.clone(),
            self.sender.clone(),
            get_rnd(self.random_seed, (index, "tracker")),
        )
    }
}
