use crate::simulation::geometry::{Direction, Location};
use std::fmt::Debug;
use tracing::debug;

/// Keeps track of the destination of the current task. The destination is set from outside, the
/// tracker only measures the way there.
pub trait DestinationTracker: Debug + Send {
    fn destination(&self) -> Location;
    fn set_destination(&mut self, destination: Location);
    fn destination_reached(&self) -> bool;
    fn destination_reached_threshold(&self) -> i64;
    fn distance_to_destination(&self) -> f64;
    /// Directions that would move a vehicle at `current` towards the destination. Empty for an
    /// axis on which the vehicle is already within the threshold.
    fn get_heading_directions(&self, current: Location) -> Vec<Direction>;
    fn update_state(&mut self, current: Location);
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicDestinationTracker {
    destination: Location,
    destination_reached: bool,
    destination_reached_threshold: i64,
    distance_to_destination: f64,
}

impl BasicDestinationTracker {
    pub fn new(destination_reached_threshold: i64) -> Self {
        Self {
            destination: Location::default(),
            destination_reached: false,
            destination_reached_threshold,
            distance_to_destination: f64::INFINITY,
        }
    }

    fn update_destination_reached_state(&mut self, current: Location) {
        let t = self.destination_reached_threshold;
        self.destination_reached =
            (self.destination.x - current.x).abs() <= t && (self.destination.y - current.y).abs() <= t;
        debug!("Destination reached: {}", self.destination_reached);
    }

    fn update_distance_to_destination(&mut self, current: Location) {
        let dx = (current.x - self.destination.x) as f64;
        let dy = (current.y - self.destination.y) as f64;
        self.distance_to_destination = (dx.hypot(dy) * 10.).round() / 10.;
    }
}

impl DestinationTracker for BasicDestinationTracker {
    fn destination(&self) -> Location {
        self.destination
    }

    fn set_destination(&mut self, destination: Location) {
        self.destination = destination;
    }

    fn destination_reached(&self) -> bool {
        self.destination_reached
    }

    fn destination_reached_threshold(&self) -> i64 {
        self.destination_reached_threshold
    }

    fn distance_to_destination(&self) -> f64 {
        self.distance_to_destination
    }

    fn get_heading_directions(&self, current: Location) -> Vec<Direction> {
        let t = self.destination_reached_threshold;
        let mut heading_directions = Vec::with_capacity(2);

        let diff = self.destination.x - current.x;
        if diff > t {
            heading_directions.push(Direction::Right);
        } else if diff < -t {
            heading_directions.push(Direction::Left);
        }

        let diff = self.destination.y - current.y;
        if diff > t {
            heading_directions.push(Direction::Up);
        } else if diff < -t {
            heading_directions.push(Direction::Down);
        }
        heading_directions
    }

    fn update_state(&mut self, current: Location) {
        self.update_destination_reached_state(current);
        self.update_distance_to_destination(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn tracker_at(destination: Location) -> BasicDestinationTracker {
        let mut tracker = BasicDestinationTracker::new(3);
        tracker.set_destination(destination);
        tracker
    }

    #[test]
    fn reached_within_threshold() {
        let mut tracker = tracker_at(Location::new(0, 0));
        tracker.update_state(Location::new(1, 1));
        assert!(tracker.destination_reached());

        let mut tracker = tracker_at(Location::new(5, 5));
        tracker.update_state(Location::new(1, 1));
        assert!(!tracker.destination_reached());
    }

    #[test]
    fn reached_is_per_axis_not_radius() {
        // euclidean distance is 4.2, both axes are within the threshold of 3
        let mut tracker = tracker_at(Location::new(3, 3));
        tracker.update_state(Location::new(0, 0));
        assert!(tracker.destination_reached());
        assert_approx_eq!(tracker.distance_to_destination(), 4.2);

        // euclidean distance is 4.0, but x is out of the threshold
        let mut tracker = tracker_at(Location::new(4, 0));
        tracker.update_state(Location::new(0, 0));
        assert!(!tracker.destination_reached());
    }

    #[test]
    fn distance_rounded_to_one_decimal() {
        let mut tracker = tracker_at(Location::new(100, 100));
        assert!(tracker.distance_to_destination().is_infinite());
        tracker.update_state(Location::new(1, 1));
        assert_approx_eq!(tracker.distance_to_destination(), 140.0);
        tracker.update_state(Location::new(1, 2));
        assert_approx_eq!(tracker.distance_to_destination(), 139.3);
    }

    #[test]
    fn heading_directions_towards_destination() {
        let tracker = tracker_at(Location::new(50, 50));
        assert_eq!(
            tracker.get_heading_directions(Location::new(1, 1)),
            vec![Direction::Right, Direction::Up]
        );
        assert_eq!(
            tracker.get_heading_directions(Location::new(90, 90)),
            vec![Direction::Left, Direction::Down]
        );
        assert_eq!(
            tracker.get_heading_directions(Location::new(48, 10)),
            vec![Direction::Up]
        );
        assert!(tracker.get_heading_directions(Location::new(53, 47)).is_empty());
    }
}
