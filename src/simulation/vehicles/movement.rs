use crate::simulation::config::Movement;
use crate::simulation::geometry::{Direction, Shift};
use rand::Rng;
use rand::rngs::SmallRng;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Which branch a turn attempt took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Turned,
    /// The next intersection is still too far away.
    NotAllowedHere,
    /// Close to the intersection but too fast; the vehicle brakes instead of turning.
    SlowedDown,
    /// Close to the intersection and slow enough, but the gate is not open yet.
    Ignored,
}

pub trait MovementManager: Debug + Send {
    fn current_speed(&self) -> i64;
    fn current_direction(&self) -> Direction;
    fn distance_until_turn_allowed(&self) -> i64;
    fn can_turn(&self) -> bool;
    fn increase_speed(&mut self);
    fn decrease_speed(&mut self);
    fn turn(&mut self, direction: Direction) -> TurnOutcome;
    /// Performs one step forward and returns the shift of the location. Must be called exactly
    /// once per navigation step.
    fn move_forward(&mut self) -> Shift;
}

/// Speed changes only gradually, by `speed_change_step` per move. A turn is allowed if the
/// speed is at most `turn_speed_threshold` and the distance until the next turn is zero.
#[derive(Debug)]
pub struct BasicMovementManager {
    params: Movement,
    current_speed: i64,
    current_direction: Direction,
    distance_until_turn_allowed: i64,
    can_turn: bool,
    rnd: SmallRng,
}

impl BasicMovementManager {
    /// A vehicle at rest, heading up, allowed to turn right away.
    pub fn new(params: Movement, rnd: SmallRng) -> Self {
        Self {
            params,
            current_speed: 0,
            current_direction: Direction::Up,
            distance_until_turn_allowed: 0,
            can_turn: true,
            rnd,
        }
    }

    pub fn max_speed(&self) -> i64 {
        self.params.max_speed
    }

    fn decide_speed_change(&mut self) {
        if self.distance_until_turn_allowed > self.current_speed {
            self.increase_speed();
        } else {
            self.decrease_speed();
        }
    }

    fn move_shift(&self) -> Shift {
        let unit = self.current_direction.unit_shift();
        Shift::new(unit.x * self.current_speed, unit.y * self.current_speed)
    }

    fn check_can_turn(&mut self) {
        self.can_turn = self.current_speed <= self.params.turn_speed_threshold
            && self.distance_until_turn_allowed == 0;
    }

    /// Simulates the distance to the next intersection.
    fn define_distance_until_turn(&mut self) -> i64 {
        let draw = self.rnd.random_range(1..=self.params.turn_distance_base);
        (draw as f64).sqrt().floor() as i64 + self.params.turn_distance_offset
    }
}

impl MovementManager for BasicMovementManager {
    fn current_speed(&self) -> i64 {
        self.current_speed
    }

    fn current_direction(&self) -> Direction {
        self.current_direction
    }

    fn distance_until_turn_allowed(&self) -> i64 {
        self.distance_until_turn_allowed
    }

    fn can_turn(&self) -> bool {
        self.can_turn
    }

    fn increase_speed(&mut self) {
        self.current_speed =
            self.current_speed
                .saturating_add(self.params.speed_change_step)
                .min(self.params.max_speed);
        debug!("Increased speed to {}", self.current_speed);
    }

    fn decrease_speed(&mut self) {
        self.current_speed = self
            .current_speed
            .saturating_sub(self.params.speed_change_step)
            .max(1);
        debug!("Decreased speed to {}", self.current_speed);
    }

    // The order of the branches matters: the distance check comes first, and only the speed
    // branch changes state without turning.
    fn turn(&mut self, direction: Direction) -> TurnOutcome {
        if self.can_turn {
            self.current_direction = direction;
            self.distance_until_turn_allowed = self.define_distance_until_turn();
            debug!(
                "Turned {}, distance until turn allowed {}",
                direction, self.distance_until_turn_allowed
            );
            TurnOutcome::Turned
        } else if self.distance_until_turn_allowed > 2 {
            warn!(
                "Can't make turn because turn is not allowed here, distance until turn allowed {}",
                self.distance_until_turn_allowed
            );
            TurnOutcome::NotAllowedHere
        } else if self.current_speed > self.params.turn_speed_threshold {
            warn!(
                "Can't make turn, because speed too high: {}, will decrease speed instead",
                self.current_speed
            );
            self.decrease_speed();
            TurnOutcome::SlowedDown
        } else {
            TurnOutcome::Ignored
        }
    }

    fn move_forward(&mut self) -> Shift {
        self.decide_speed_change();
        let shift = self.move_shift();
        // the gate never drops below zero, otherwise a vehicle that passed its intersection too
        // fast could never turn again
        self.distance_until_turn_allowed = (self.distance_until_turn_allowed - 1).max(0);
        self.check_can_turn();
        shift
    }
}
