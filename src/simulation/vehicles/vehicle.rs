use crate::simulation::geometry::Location;
use crate::simulation::vehicles::heading::HeadingError;
use crate::simulation::vehicles::navigation::{NavigationError, NavigationManager};
use crate::simulation::vehicles::tasks::{TaskState, TasksManager};
use crate::simulation::vehicles::tracker::{TrackerManager, TrackerStatus, Transmission};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VehicleError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Heading(#[from] HeadingError),
    #[error("invalid vehicle option '{option}': {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

/// Result of one execution step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The vehicle was idle and did not get a task.
    NoTask,
    /// The vehicle was idle and accepted a task. It does not move in the same step.
    TaskAccepted(Location),
    Moved(Transmission),
    DestinationReached(Transmission),
}

/// One simulated vehicle. Each step runs tasks, then navigation, then tracking.
#[derive(Debug)]
pub struct Vehicle {
    navigation: Box<dyn NavigationManager>,
    tasks: Box<dyn TasksManager>,
    tracker: Box<dyn TrackerManager>,
}

impl Vehicle {
    pub fn new(
        navigation: Box<dyn NavigationManager>,
        tasks: Box<dyn TasksManager>,
        tracker: Box<dyn TrackerManager>,
    ) -> Self {
        Self {
            navigation,
            tasks,
            tracker,
        }
    }

    pub fn vehicle_id(&self) -> Uuid {
        self.tracker.vehicle_id()
    }

    pub fn current_location(&self) -> Location {
        self.navigation.current_location()
    }

    pub fn current_tracker_status(&self) -> TrackerStatus {
        self.tracker.current_status()
    }

    pub fn current_task_state(&self) -> TaskState {
        self.tasks.task_state()
    }

    pub fn navigation(&self) -> &dyn NavigationManager {
        self.navigation.as_ref()
    }

    pub fn navigation_mut(&mut self) -> &mut dyn NavigationManager {
        self.navigation.as_mut()
    }

    pub fn run_execution_step(&mut self) -> Result<StepOutcome, VehicleError> {
        if self.tasks.task_state() == TaskState::Idle {
            debug!("Idle, trying to get a new task");
            return match self.tasks.get_new_task() {
                Some(task) => {
                    self.tasks.initialize_new_task(task);
                    self.navigation.initialize_new_task(task);
                    debug!("Accepted new task, destination {}", task);
                    Ok(StepOutcome::TaskAccepted(task))
                }
                None => Ok(StepOutcome::NoTask),
            };
        }

        self.navigation.move_to_destination()?;

        let reached = self.navigation.destination_reached();
        if reached {
            debug!("Reached destination {}", self.navigation.destination());
            self.tasks.destination_reached();
        }
        debug!(
            "Current distance: {}",
            self.navigation.distance_to_destination()
        );

        self.tracker.update();
        let transmission = self
            .tracker
            .send_tracking_data(self.tasks.as_ref(), self.navigation.as_ref());

        if reached {
            Ok(StepOutcome::DestinationReached(transmission))
        } else {
            Ok(StepOutcome::Moved(transmission))
        }
    }
}
