use crate::simulation::geometry::{Location, Shift};
use crate::simulation::map::NavigationMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the position of one vehicle.
pub trait LocationService: Debug + Send {
    fn current_location(&self) -> Location;
    fn nav_map(&self) -> &Arc<NavigationMap>;
    fn update_location(&mut self, shift: Shift);
    fn override_current_location(&mut self, location: Location);
}

#[derive(Debug)]
pub struct BasicLocationService {
    nav_map: Arc<NavigationMap>,
    current_location: Location,
}

impl BasicLocationService {
    pub fn new(nav_map: Arc<NavigationMap>, current_location: Location) -> Self {
        Self {
            nav_map,
            current_location,
        }
    }
}

impl LocationService for BasicLocationService {
    fn current_location(&self) -> Location {
        self.current_location
    }

    fn nav_map(&self) -> &Arc<NavigationMap> {
        &self.nav_map
    }

    fn update_location(&mut self, shift: Shift) {
        self.current_location = self.current_location.shifted(shift);
        info!("Vehicle moved to {}", self.current_location);
    }

    fn override_current_location(&mut self, location: Location) {
        self.current_location = location;
        warn!(
            "Location overridden to {}, inside map: {}",
            location,
            self.nav_map.contains(&location)
        );
    }
}
