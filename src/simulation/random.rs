use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// Random number generator utilities.
// Every vehicle component draws from its own stream, derived from the base seed of the run.

/// Gets a random number generator for a specific vehicle component.
/// The hash parameter should uniquely identify the component, e.g. `(vehicle_index, "movement")`.
pub fn get_rnd<H: Hash>(base_seed: u64, hash: H) -> SmallRng {
    // Combine base seed with the hash to get a unique seed for this component
    let mut hasher = DefaultHasher::new();
    hash.hash(&mut hasher);
    base_seed.hash(&mut hasher);
    let combined_seed = hasher.finish();

    SmallRng::seed_from_u64(combined_seed)
}
