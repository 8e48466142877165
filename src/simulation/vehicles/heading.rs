use crate::simulation::geometry::{Direction, Location};
use crate::simulation::map::NavigationMap;
use crate::simulation::vehicles::destination::DestinationTracker;
use crate::simulation::vehicles::zone::AllowedZoneManager;
use rand::distr::Distribution;
use rand::distr::weighted::{Error as WeightError, WeightedIndex};
use rand::rngs::SmallRng;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

const BASE_HEADING_WEIGHT: f64 = 25.;

#[derive(Error, Debug)]
pub enum HeadingError {
    #[error("weight of heading provider '{name}' must be a positive number, got {weight}")]
    InvalidWeight { name: String, weight: f64 },
    #[error("heading probabilities can't be sampled: {0}")]
    Distribution(#[from] WeightError),
}

/// Read only view on the navigation state of one vehicle, handed to heading providers.
#[derive(Debug, Clone, Copy)]
pub struct NavigationView<'a> {
    pub location: Location,
    pub map: &'a NavigationMap,
    pub destination: &'a dyn DestinationTracker,
    pub zone: &'a dyn AllowedZoneManager,
}

/// Suggests a subset of directions. Suggested directions get their weight multiplied by the
/// weight the provider was registered with.
pub trait HeadingProvider: Debug + Send {
    fn heading_directions(&mut self, view: &NavigationView<'_>) -> Vec<Direction>;
}

/// Steers towards the destination of the current task.
#[derive(Debug, Default, Clone, Copy)]
pub struct DestinationHeading;

impl HeadingProvider for DestinationHeading {
    fn heading_directions(&mut self, view: &NavigationView<'_>) -> Vec<Direction> {
        view.destination.get_heading_directions(view.location)
    }
}

/// Steers back into the map after a vehicle left it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoneReturnHeading;

impl HeadingProvider for ZoneReturnHeading {
    fn heading_directions(&mut self, view: &NavigationView<'_>) -> Vec<Direction> {
        view.zone
            .zone_borders_breached()
            .iter()
            .map(|d| d.opposite())
            .collect()
    }
}

#[derive(Debug)]
struct RegisteredProvider {
    name: String,
    weight: f64,
    provider: Box<dyn HeadingProvider>,
}

/// Weighted random selection of the next heading. All directions start with the same weight,
/// every provider then boosts the directions it suggests. Providers are asked in registration
/// order, which keeps draws reproducible for a fixed seed.
#[derive(Debug)]
pub struct HeadingDirectionManager {
    providers: Vec<RegisteredProvider>,
    heading_direction: Direction,
    rnd: SmallRng,
}

impl HeadingDirectionManager {
    pub fn new(rnd: SmallRng) -> Self {
        Self {
            providers: Vec::new(),
            heading_direction: Direction::Up,
            rnd,
        }
    }

    /// Registers a provider under `name`. A provider registered under an existing name replaces
    /// the earlier one and keeps its position.
    pub fn register_heading_provider(
        &mut self,
        name: &str,
        provider: Box<dyn HeadingProvider>,
        weight: f64,
    ) -> Result<(), HeadingError> {
        if !weight.is_finite() || weight <= 0. {
            return Err(HeadingError::InvalidWeight {
                name: name.to_string(),
                weight,
            });
        }

        let registered = RegisteredProvider {
            name: name.to_string(),
            weight,
            provider,
        };
        match self.providers.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = registered,
            None => self.providers.push(registered),
        }
        debug!("Registered heading provider {name} with weight {weight}");
        Ok(())
    }

    /// Names and weights of the registered providers, in registration order.
    pub fn providers(&self) -> Vec<(&str, f64)> {
        self.providers
            .iter()
            .map(|p| (p.name.as_str(), p.weight))
            .collect()
    }

    /// The direction of the last draw.
    pub fn heading_direction(&self) -> Direction {
        self.heading_direction
    }

    /// Probability of each direction, in the order of [Direction::ALL]. Sums up to 1.
    pub fn heading_probabilities(&mut self, view: &NavigationView<'_>) -> [f64; 4] {
        let mut weights = [BASE_HEADING_WEIGHT; 4];
        for registered in self.providers.iter_mut() {
            let suggested = registered.provider.heading_directions(view);
            for (direction, weight) in Direction::ALL.iter().zip(weights.iter_mut()) {
                if suggested.contains(direction) {
                    *weight *= registered.weight;
                }
            }
        }

        let total: f64 = weights.iter().sum();
        weights.map(|w| w / total)
    }

    /// Draws a new heading direction and remembers it.
    pub fn update_heading_direction(
        &mut self,
        view: &NavigationView<'_>,
    ) -> Result<Direction, HeadingError> {
        let probabilities = self.heading_probabilities(view);
        debug!("Heading probabilities: {:?}", probabilities);

        let dist = WeightedIndex::new(probabilities)?;
        self.heading_direction = Direction::ALL[dist.sample(&mut self.rnd)];
        debug!("Direction: {}", self.heading_direction);
        Ok(self.heading_direction)
    }
}
