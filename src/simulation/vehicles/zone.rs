use crate::simulation::geometry::{Direction, Location};
use crate::simulation::map::NavigationMap;
use std::fmt::Debug;

/// Tracks whether a vehicle is inside the map, and which borders it crossed.
pub trait AllowedZoneManager: Debug + Send {
    fn out_of_zone(&self) -> bool;
    fn zone_borders_breached(&self) -> &[Direction];
    fn update_state(&mut self, location: Location, map: &NavigationMap);
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BasicAllowedZoneManager {
    out_of_zone: bool,
    zone_borders_breached: Vec<Direction>,
}

impl BasicAllowedZoneManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AllowedZoneManager for BasicAllowedZoneManager {
    fn out_of_zone(&self) -> bool {
        self.out_of_zone
    }

    fn zone_borders_breached(&self) -> &[Direction] {
        &self.zone_borders_breached
    }

    // A location breaches at most one border per axis.
    fn update_state(&mut self, location: Location, map: &NavigationMap) {
        self.zone_borders_breached.clear();

        if location.x < 0 {
            self.zone_borders_breached.push(Direction::Left);
        } else if location.x > map.x_size() {
            self.zone_borders_breached.push(Direction::Right);
        }

        if location.y < 0 {
            self.zone_borders_breached.push(Direction::Down);
        } else if location.y > map.y_size() {
            self.zone_borders_breached.push(Direction::Up);
        }

        self.out_of_zone = !self.zone_borders_breached.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(x: i64, y: i64) -> BasicAllowedZoneManager {
        let map = NavigationMap::new(100, 50).unwrap();
        let mut zone = BasicAllowedZoneManager::new();
        zone.update_state(Location::new(x, y), &map);
        zone
    }

    #[test]
    fn inside_the_map() {
        for (x, y) in [(0, 0), (100, 50), (37, 12), (0, 50), (100, 0)] {
            let zone = check(x, y);
            assert!(!zone.out_of_zone(), "({x}, {y})");
            assert!(zone.zone_borders_breached().is_empty());
        }
    }

    #[test]
    fn single_border() {
        assert_eq!(check(-1, 10).zone_borders_breached(), &[Direction::Left]);
        assert_eq!(check(101, 10).zone_borders_breached(), &[Direction::Right]);
        assert_eq!(check(10, -3).zone_borders_breached(), &[Direction::Down]);
        assert_eq!(check(10, 51).zone_borders_breached(), &[Direction::Up]);
        assert!(check(10, 51).out_of_zone());
    }

    #[test]
    fn corner_breaches_two_borders() {
        let zone = check(-5, 60);
        assert!(zone.out_of_zone());
        assert_eq!(zone.zone_borders_breached(), &[Direction::Left, Direction::Up]);
    }

    #[test]
    fn state_is_reset_on_every_update() {
        let map = NavigationMap::new(100, 50).unwrap();
        let mut zone = BasicAllowedZoneManager::new();
        zone.update_state(Location::new(200, -1), &map);
        assert_eq!(zone.zone_borders_breached().len(), 2);
        zone.update_state(Location::new(20, 20), &map);
        assert!(!zone.out_of_zone());
        assert!(zone.zone_borders_breached().is_empty());
    }
}
