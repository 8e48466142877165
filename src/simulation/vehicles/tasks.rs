use crate::simulation::geometry::Location;
use crate::simulation::map::NavigationMap;
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Idle,
    #[serde(rename = "In progress")]
    InProgress,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Idle => "Idle",
            TaskState::InProgress => "In progress",
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of tasks for one vehicle. Acquiring a task is unreliable: [TasksManager::get_new_task]
/// may come back empty handed.
pub trait TasksManager: Debug + Send {
    fn task_state(&self) -> TaskState;
    fn current_task(&self) -> Option<Location>;
    /// Draws a new task without accepting it.
    fn get_new_task(&mut self) -> Option<Location>;
    fn initialize_new_task(&mut self, task: Location);
    fn destination_reached(&mut self);
}

#[derive(Debug)]
pub struct BasicTasksManager {
    nav_map: Arc<NavigationMap>,
    fail_probability: f64,
    task_state: TaskState,
    current_task: Option<Location>,
    rnd: SmallRng,
}

impl BasicTasksManager {
    pub fn new(nav_map: Arc<NavigationMap>, fail_probability: f64, rnd: SmallRng) -> Self {
        Self {
            nav_map,
            fail_probability,
            task_state: TaskState::Idle,
            current_task: None,
            rnd,
        }
    }

    fn fail_to_get_task(&mut self) -> bool {
        self.rnd.random::<f64>() < self.fail_probability
    }

    fn generate_random_location(&mut self) -> Location {
        let x = self.rnd.random_range(0..self.nav_map.x_size());
        let y = self.rnd.random_range(0..self.nav_map.y_size());
        Location::new(x, y)
    }
}

impl TasksManager for BasicTasksManager {
    fn task_state(&self) -> TaskState {
        self.task_state
    }

    fn current_task(&self) -> Option<Location> {
        self.current_task
    }

    fn get_new_task(&mut self) -> Option<Location> {
        if self.fail_to_get_task() {
            warn!("Failed to get a new task");
            return None;
        }
        Some(self.generate_random_location())
    }

    fn initialize_new_task(&mut self, task: Location) {
        self.current_task = Some(task);
        self.task_state = TaskState::InProgress;
        debug!("Accepted task {task}");
    }

    fn destination_reached(&mut self) {
        self.task_state = TaskState::Idle;
    }
}
