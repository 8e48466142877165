use crate::simulation::geometry::{Direction, Location};
use crate::simulation::vehicles::destination::DestinationTracker;
use crate::simulation::vehicles::heading::{HeadingDirectionManager, HeadingError, NavigationView};
use crate::simulation::vehicles::location::LocationService;
use crate::simulation::vehicles::movement::MovementManager;
use crate::simulation::vehicles::zone::AllowedZoneManager;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error(transparent)]
    Heading(#[from] HeadingError),
}

/// Moves a vehicle towards the destination of its current task.
pub trait NavigationManager: Debug + Send {
    /// One navigation step: maybe turn, move once, refresh destination and zone state.
    fn move_to_destination(&mut self) -> Result<(), NavigationError>;
    fn initialize_new_task(&mut self, destination: Location);
    fn override_current_location(&mut self, location: Location);

    fn current_location(&self) -> Location;
    fn current_speed(&self) -> i64;
    fn current_direction(&self) -> Direction;
    fn destination(&self) -> Location;
    fn distance_to_destination(&self) -> f64;
    fn destination_reached(&self) -> bool;
    fn distance_until_turn_allowed(&self) -> i64;
    fn out_of_zone(&self) -> bool;
    fn zone_borders_breached(&self) -> &[Direction];
}

#[derive(Debug)]
pub struct BasicNavigationManager {
    location_service: Box<dyn LocationService>,
    movement_manager: Box<dyn MovementManager>,
    destination_tracker: Box<dyn DestinationTracker>,
    zone_manager: Box<dyn AllowedZoneManager>,
    heading_manager: HeadingDirectionManager,
}

impl BasicNavigationManager {
    pub fn new(
        location_service: Box<dyn LocationService>,
        movement_manager: Box<dyn MovementManager>,
        destination_tracker: Box<dyn DestinationTracker>,
        zone_manager: Box<dyn AllowedZoneManager>,
        heading_manager: HeadingDirectionManager,
    ) -> Self {
        Self {
            location_service,
            movement_manager,
            destination_tracker,
            zone_manager,
            heading_manager,
        }
    }

    pub fn heading_manager(&self) -> &HeadingDirectionManager {
        &self.heading_manager
    }

    fn update_statuses(&mut self) {
        let location = self.location_service.current_location();
        self.destination_tracker.update_state(location);
        self.zone_manager
            .update_state(location, self.location_service.nav_map());
    }

    fn next_heading_direction(&mut self) -> Result<Direction, HeadingError> {
        let view = NavigationView {
            location: self.location_service.current_location(),
            map: self.location_service.nav_map(),
            destination: self.destination_tracker.as_ref(),
            zone: self.zone_manager.as_ref(),
        };
        self.heading_manager.update_heading_direction(&view)
    }
}

impl NavigationManager for BasicNavigationManager {
    fn move_to_destination(&mut self) -> Result<(), NavigationError> {
        if self.destination_tracker.destination_reached() {
            warn!("Got move command while already at destination");
            self.update_statuses();
            return Ok(());
        }

        if self.movement_manager.can_turn() {
            debug!(
                "Can turn: current speed {}, distance to turn {}",
                self.movement_manager.current_speed(),
                self.movement_manager.distance_until_turn_allowed()
            );
            let direction = self.next_heading_direction()?;
            self.movement_manager.turn(direction);
        }

        let shift = self.movement_manager.move_forward();
        self.location_service.update_location(shift);
        self.update_statuses();
        Ok(())
    }

    fn initialize_new_task(&mut self, destination: Location) {
        self.destination_tracker.set_destination(destination);
        self.update_statuses();
    }

    fn override_current_location(&mut self, location: Location) {
        self.location_service.override_current_location(location);
        self.update_statuses();
    }

    fn current_location(&self) -> Location {
        self.location_service.current_location()
    }

    fn current_speed(&self) -> i64 {
        self.movement_manager.current_speed()
    }

    fn current_direction(&self) -> Direction {
        self.movement_manager.current_direction()
    }

    fn destination(&self) -> Location {
        self.destination_tracker.destination()
    }

    fn distance_to_destination(&self) -> f64 {
        self.destination_tracker.distance_to_destination()
    }

    fn destination_reached(&self) -> bool {
        self.destination_tracker.destination_reached()
    }

    fn distance_until_turn_allowed(&self) -> i64 {
        self.movement_manager.distance_until_turn_allowed()
    }

    fn out_of_zone(&self) -> bool {
        self.zone_manager.out_of_zone()
    }

    fn zone_borders_breached(&self) -> &[Direction] {
        self.zone_manager.zone_borders_breached()
    }
}
