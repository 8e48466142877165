//! The parts of a simulated vehicle. Every concern sits behind a trait, so that a vehicle can be
//! assembled from other implementations, see [factory::VehicleFactory] for the default wiring.

pub mod destination;
pub mod factory;
pub mod heading;
pub mod location;
pub mod movement;
pub mod navigation;
pub mod tasks;
pub mod tracker;
pub mod vehicle;
pub mod zone;
