use crate::simulation::io::resolve_path;
use crate::simulation::map::MAX_MAP_SIZE;
use ahash::HashMap;
use clap::Parser;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

/// Macro to register an override handler for a specific config key
#[macro_export]
macro_rules! register_override {
    ($key:literal, $func:expr) => {
        inventory::submit! {
            $crate::simulation::config::OverrideHandler {
                key: $key,
                apply: $func,
            }
        }
    };
}

pub struct OverrideHandler {
    pub key: &'static str,
    pub apply: fn(config: &mut Config, value: &str) -> Result<(), ConfigError>,
}

// Collect all OverrideHandler submitted from anywhere in the crate
inventory::collect!(OverrideHandler);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to open config file at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write config to {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("module '{key}' has an unexpected type")]
    WrongModuleType { key: String },
    #[error("invalid value '{value}' for override '{key}'")]
    InvalidOverride { key: String, value: String },
    #[error("invalid config value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    #[arg(long = "set", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,
}

impl CommandLineArgs {
    pub fn new_with_path(path: impl Into<PathBuf>) -> Self {
        CommandLineArgs {
            config: Some(path.into()),
            overrides: Vec::new(),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=');
    match pos {
        Some(pos) => Ok((s[..pos].to_string(), s[pos + 1..].to_string())),
        None => Err(format!("invalid KEY=VALUE: no `=` found in `{}`", s)),
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    //this is deliberately a Mutex, as getters insert defaults through a shared reference
    #[serde(default)]
    modules: Mutex<HashMap<String, Box<dyn ConfigModule>>>,
    #[serde(skip)]
    context: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            modules: Mutex::new(HashMap::default()),
            context: None,
        }
    }
}

impl TryFrom<CommandLineArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: CommandLineArgs) -> Result<Self, Self::Error> {
        let mut config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(&args.overrides)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn from_file(config_path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: config_path.to_path_buf(),
                source,
            })?;
        config.set_context(Some(config_path.to_path_buf()));
        Ok(config)
    }

    pub fn set_context(&mut self, context: Option<PathBuf>) {
        self.context = context;
    }

    pub fn context(&self) -> &Option<PathBuf> {
        &self.context
    }

    /// Apply generic key-value overrides to the config, e.g. map.x_size=200
    pub fn apply_overrides(&mut self, overrides: &[(String, String)]) -> Result<(), ConfigError> {
        info!("Applying overrides: {:?}", overrides);

        for (key, value) in overrides {
            let key_str = key.as_str();

            if let Some(handler) = inventory::iter::<OverrideHandler>().find(|h| h.key == key_str) {
                (handler.apply)(self, value)?;
            } else {
                warn!("No override handler found for key: {}", key);
            }
        }
        Ok(())
    }

    pub fn simulation(&self) -> Simulation {
        self.module_or_default("simulation")
    }

    pub fn set_simulation(&mut self, simulation: Simulation) {
        self.set_module("simulation", simulation);
    }

    pub fn map(&self) -> MapSize {
        self.module_or_default("map")
    }

    pub fn set_map(&mut self, map: MapSize) {
        self.set_module("map", map);
    }

    pub fn movement(&self) -> Movement {
        self.module_or_default("movement")
    }

    pub fn set_movement(&mut self, movement: Movement) {
        self.set_module("movement", movement);
    }

    pub fn navigation(&self) -> Navigation {
        self.module_or_default("navigation")
    }

    pub fn set_navigation(&mut self, navigation: Navigation) {
        self.set_module("navigation", navigation);
    }

    pub fn tasks(&self) -> Tasks {
        self.module_or_default("tasks")
    }

    pub fn set_tasks(&mut self, tasks: Tasks) {
        self.set_module("tasks", tasks);
    }

    pub fn tracker(&self) -> Tracker {
        self.module_or_default("tracker")
    }

    pub fn set_tracker(&mut self, tracker: Tracker) {
        self.set_module("tracker", tracker);
    }

    pub fn output(&self) -> Output {
        self.module_or_default("output")
    }

    pub fn set_output(&mut self, output: Output) {
        self.set_module("output", output);
    }

    /// The output directory resolved against the location of the config file.
    pub fn output_dir(&self) -> PathBuf {
        resolve_path(self.context(), &self.output().output_dir)
    }

    /// Checks every value the simulation relies on. A config that passes can be used to build
    /// vehicles without further checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_type::<Simulation>("simulation")?;
        self.check_type::<MapSize>("map")?;
        self.check_type::<Movement>("movement")?;
        self.check_type::<Navigation>("navigation")?;
        self.check_type::<Tasks>("tasks")?;
        self.check_type::<Tracker>("tracker")?;
        self.check_type::<Output>("output")?;

        let simulation = self.simulation();
        ensure(
            simulation.concurrency_limit >= 1,
            "simulation.concurrency_limit",
            "must be at least 1",
        )?;
        ensure(
            simulation.sleep_min_sec.is_finite() && simulation.sleep_min_sec >= 0.,
            "simulation.sleep_min_sec",
            "must be a non-negative number",
        )?;
        ensure(
            simulation.sleep_max_sec.is_finite()
                && simulation.sleep_max_sec >= simulation.sleep_min_sec,
            "simulation.sleep_max_sec",
            "must not be smaller than sleep_min_sec",
        )?;

        let map = self.map();
        ensure(
            (1..=MAX_MAP_SIZE).contains(&map.x_size),
            "map.x_size",
            "must be positive and at most 1000000000",
        )?;
        ensure(
            (1..=MAX_MAP_SIZE).contains(&map.y_size),
            "map.y_size",
            "must be positive and at most 1000000000",
        )?;

        let movement = self.movement();
        ensure(
            (1..=MAX_MAP_SIZE).contains(&movement.max_speed),
            "movement.max_speed",
            "must be at least 1 and at most 1000000000",
        )?;
        ensure(
            (1..=MAX_MAP_SIZE).contains(&movement.speed_change_step),
            "movement.speed_change_step",
            "must be at least 1 and at most 1000000000",
        )?;
        ensure(
            movement.turn_distance_base >= 1,
            "movement.turn_distance_base",
            "must be at least 1",
        )?;
        ensure(
            movement.turn_distance_offset >= 0,
            "movement.turn_distance_offset",
            "must not be negative",
        )?;
        ensure(
            movement.turn_speed_threshold >= 0,
            "movement.turn_speed_threshold",
            "must not be negative",
        )?;

        let navigation = self.navigation();
        ensure(
            navigation.destination_reached_threshold >= 0,
            "navigation.destination_reached_threshold",
            "must not be negative",
        )?;
        ensure(
            navigation.destination_weight.is_finite() && navigation.destination_weight > 0.,
            "navigation.destination_weight",
            "must be a positive number",
        )?;
        if let Some(weight) = navigation.zone_return_weight {
            ensure(
                weight.is_finite() && weight > 0.,
                "navigation.zone_return_weight",
                "must be a positive number",
            )?;
        }

        let tasks = self.tasks();
        ensure(
            (0.0..=1.0).contains(&tasks.fail_probability),
            "tasks.fail_probability",
            "must be within [0, 1]",
        )?;

        let tracker = self.tracker();
        ensure(
            (0.0..=1.0).contains(&tracker.online_probability),
            "tracker.online_probability",
            "must be within [0, 1]",
        )?;
        ensure(
            (0.0..=1.0).contains(&tracker.offline_probability),
            "tracker.offline_probability",
            "must be within [0, 1]",
        )?;
        ensure(
            tracker.online_probability + tracker.offline_probability > 0.,
            "tracker.online_probability",
            "online and offline probabilities must not both be zero",
        )?;

        Ok(())
    }

    fn modules(&self) -> MutexGuard<'_, HashMap<String, Box<dyn ConfigModule>>> {
        self.modules.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_module<T: ConfigModule + 'static>(&mut self, key: &str, module: T) {
        self.modules().insert(key.to_string(), Box::new(module));
    }

    fn module_or_default<T: ConfigModule + Default + Clone + 'static>(&self, key: &str) -> T {
        if let Some(module) = self.module::<T>(key) {
            module
        } else {
            let default = T::default();
            // only insert if the key is absent, a module of another type stays for validate()
            self.modules()
                .entry(key.to_string())
                .or_insert_with(|| Box::new(default.clone()));
            default
        }
    }

    fn module<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.modules()
            .get(key)
            .and_then(|boxed| boxed.as_ref().as_any().downcast_ref::<T>().cloned())
    }

    fn check_type<T: 'static>(&self, key: &str) -> Result<(), ConfigError> {
        match self.modules().get(key) {
            Some(module) if !module.as_any().is::<T>() => Err(ConfigError::WrongModuleType {
                key: key.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn ensure(condition: bool, key: &'static str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: reason.to_string(),
        })
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub fn write_config(config: &Config, output_path: &Path) -> Result<(), ConfigError> {
    let output_config = output_path.join("output_config.yml");
    let file = File::create(&output_config).map_err(|e| ConfigError::Write {
        path: output_config.clone(),
        reason: e.to_string(),
    })?;
    let writer = BufWriter::new(file);
    serde_yaml::to_writer(writer, config).map_err(|e| ConfigError::Write {
        path: output_config,
        reason: e.to_string(),
    })
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Simulation {
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    #[serde(default)]
    pub run_infinitely: bool,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_vehicles")]
    pub vehicles: usize,
    #[serde(default = "default_sleep_min")]
    pub sleep_min_sec: f64,
    #[serde(default = "default_sleep_max")]
    pub sleep_max_sec: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            random_seed: default_seed(),
            concurrency_limit: default_concurrency_limit(),
            run_infinitely: false,
            rounds: default_rounds(),
            vehicles: default_vehicles(),
            sleep_min_sec: default_sleep_min(),
            sleep_max_sec: default_sleep_max(),
        }
    }
}

register_override!("simulation.random_seed", |config, value| {
    let mut simulation = config.simulation();
    simulation.random_seed = parse_override("simulation.random_seed", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.concurrency_limit", |config, value| {
    let mut simulation = config.simulation();
    simulation.concurrency_limit = parse_override("simulation.concurrency_limit", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.run_infinitely", |config, value| {
    let mut simulation = config.simulation();
    simulation.run_infinitely = parse_override("simulation.run_infinitely", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.rounds", |config, value| {
    let mut simulation = config.simulation();
    simulation.rounds = parse_override("simulation.rounds", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.vehicles", |config, value| {
    let mut simulation = config.simulation();
    simulation.vehicles = parse_override("simulation.vehicles", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.sleep_min_sec", |config, value| {
    let mut simulation = config.simulation();
    simulation.sleep_min_sec = parse_override("simulation.sleep_min_sec", value)?;
    config.set_simulation(simulation);
    Ok(())
});

register_override!("simulation.sleep_max_sec", |config, value| {
    let mut simulation = config.simulation();
    simulation.sleep_max_sec = parse_override("simulation.sleep_max_sec", value)?;
    config.set_simulation(simulation);
    Ok(())
});

/// Size of the navigation map. Signed, so that a negative size in a config file reaches
/// [Config::validate] instead of failing as a parse error.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MapSize {
    pub x_size: i64,
    pub y_size: i64,
}

impl Default for MapSize {
    fn default() -> Self {
        MapSize {
            x_size: 100,
            y_size: 100,
        }
    }
}

register_override!("map.x_size", |config, value| {
    let mut map = config.map();
    map.x_size = parse_override("map.x_size", value)?;
    config.set_map(map);
    Ok(())
});

register_override!("map.y_size", |config, value| {
    let mut map = config.map();
    map.y_size = parse_override("map.y_size", value)?;
    config.set_map(map);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Movement {
    #[serde(default = "default_max_speed")]
    pub max_speed: i64,
    /// Upper bound of the uniform draw whose square root gives the distance to the next turn.
    #[serde(default = "default_turn_distance_base")]
    pub turn_distance_base: i64,
    #[serde(default = "default_turn_distance_offset")]
    pub turn_distance_offset: i64,
    #[serde(default = "default_turn_speed_threshold")]
    pub turn_speed_threshold: i64,
    #[serde(default = "default_speed_change_step")]
    pub speed_change_step: i64,
}

impl Default for Movement {
    fn default() -> Self {
        Movement {
            max_speed: default_max_speed(),
            turn_distance_base: default_turn_distance_base(),
            turn_distance_offset: default_turn_distance_offset(),
            turn_speed_threshold: default_turn_speed_threshold(),
            speed_change_step: default_speed_change_step(),
        }
    }
}

register_override!("movement.max_speed", |config, value| {
    let mut movement = config.movement();
    movement.max_speed = parse_override("movement.max_speed", value)?;
    config.set_movement(movement);
    Ok(())
});

register_override!("movement.turn_distance_base", |config, value| {
    let mut movement = config.movement();
    movement.turn_distance_base = parse_override("movement.turn_distance_base", value)?;
    config.set_movement(movement);
    Ok(())
});

register_override!("movement.turn_distance_offset", |config, value| {
    let mut movement = config.movement();
    movement.turn_distance_offset = parse_override("movement.turn_distance_offset", value)?;
    config.set_movement(movement);
    Ok(())
});

register_override!("movement.turn_speed_threshold", |config, value| {
    let mut movement = config.movement();
    movement.turn_speed_threshold = parse_override("movement.turn_speed_threshold", value)?;
    config.set_movement(movement);
    Ok(())
});

register_override!("movement.speed_change_step", |config, value| {
    let mut movement = config.movement();
    movement.speed_change_step = parse_override("movement.speed_change_step", value)?;
    config.set_movement(movement);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Navigation {
    #[serde(default = "default_destination_reached_threshold")]
    pub destination_reached_threshold: i64,
    #[serde(default = "default_destination_weight")]
    pub destination_weight: f64,
    /// If set, a heading provider steering back into the map is registered with this weight.
    #[serde(default)]
    pub zone_return_weight: Option<f64>,
}

impl Default for Navigation {
    fn default() -> Self {
        Navigation {
            destination_reached_threshold: default_destination_reached_threshold(),
            destination_weight: default_destination_weight(),
            zone_return_weight: None,
        }
    }
}

register_override!("navigation.destination_reached_threshold", |config, value| {
    let mut navigation = config.navigation();
    navigation.destination_reached_threshold =
        parse_override("navigation.destination_reached_threshold", value)?;
    config.set_navigation(navigation);
    Ok(())
});

register_override!("navigation.destination_weight", |config, value| {
    let mut navigation = config.navigation();
    navigation.destination_weight = parse_override("navigation.destination_weight", value)?;
    config.set_navigation(navigation);
    Ok(())
});

register_override!("navigation.zone_return_weight", |config, value| {
    let mut navigation = config.navigation();
    navigation.zone_return_weight = match value.to_lowercase().as_str() {
        "none" | "" => None,
        _ => Some(parse_override("navigation.zone_return_weight", value)?),
    };
    config.set_navigation(navigation);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Tasks {
    /// Probability that a task request finds the task queue empty.
    #[serde(default = "default_fail_probability")]
    pub fail_probability: f64,
}

impl Default for Tasks {
    fn default() -> Self {
        Tasks {
            fail_probability: default_fail_probability(),
        }
    }
}

register_override!("tasks.fail_probability", |config, value| {
    let mut tasks = config.tasks();
    tasks.fail_probability = parse_override("tasks.fail_probability", value)?;
    config.set_tasks(tasks);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Tracker {
    #[serde(default = "default_online_probability")]
    pub online_probability: f64,
    #[serde(default = "default_offline_probability")]
    pub offline_probability: f64,
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker {
            online_probability: default_online_probability(),
            offline_probability: default_offline_probability(),
        }
    }
}

register_override!("tracker.online_probability", |config, value| {
    let mut tracker = config.tracker();
    tracker.online_probability = parse_override("tracker.online_probability", value)?;
    config.set_tracker(tracker);
    Ok(())
});

register_override!("tracker.offline_probability", |config, value| {
    let mut tracker = config.tracker();
    tracker.offline_probability = parse_override("tracker.offline_probability", value)?;
    config.set_tracker(tracker);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Output {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub write_telemetry: WriteTelemetry,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            output_dir: PathBuf::from("./output"),
            logging: Logging::None,
            write_telemetry: WriteTelemetry::None,
        }
    }
}

register_override!("output.output_dir", |config, value| {
    let mut output = config.output();
    output.output_dir = PathBuf::from(value);
    config.set_output(output);
    Ok(())
});

register_override!("output.write_telemetry", |config, value| {
    let mut output = config.output();
    output.write_telemetry = match value.to_lowercase().as_str() {
        "none" => WriteTelemetry::None,
        "jsonlines" | "json-lines" => WriteTelemetry::JsonLines,
        _ => {
            return Err(ConfigError::InvalidOverride {
                key: "output.write_telemetry".to_string(),
                value: value.to_string(),
            });
        }
    };
    config.set_output(output);
    Ok(())
});

/// Have this extra layer of log level enum, as tracing subscriber has no
/// off/none option by default. At least it can't be parsed
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum WriteTelemetry {
    #[default]
    None,
    JsonLines,
}

#[typetag::serde(tag = "type")]
pub trait ConfigModule: Debug + Send + DynClone {
    fn as_any(&self) -> &dyn Any;
}

#[typetag::serde]
impl ConfigModule for Simulation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for MapSize {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Movement {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Navigation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Tasks {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Tracker {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Output {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// This is needed to allow cloning of the trait object and thus cloning of the Config.
dyn_clone::clone_trait_object!(ConfigModule);

fn default_seed() -> u64 {
    42
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_rounds() -> u32 {
    100
}

fn default_vehicles() -> usize {
    10
}

fn default_sleep_min() -> f64 {
    0.5
}

fn default_sleep_max() -> f64 {
    2.0
}

fn default_max_speed() -> i64 {
    5
}

fn default_turn_distance_base() -> i64 {
    100
}

fn default_turn_distance_offset() -> i64 {
    2
}

fn default_turn_speed_threshold() -> i64 {
    2
}

fn default_speed_change_step() -> i64 {
    1
}

fn default_destination_reached_threshold() -> i64 {
    3
}

fn default_destination_weight() -> f64 {
    10.
}

fn default_fail_probability() -> f64 {
    0.95
}

fn default_online_probability() -> f64 {
    0.8
}

fn default_offline_probability() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use crate::simulation::config::{
        parse_key_val, CommandLineArgs, Config, ConfigError, Logging, MapSize, Movement,
        Navigation, Output, Simulation, Tasks, Tracker, WriteTelemetry,
    };
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn read_from_yaml() {
        let mut config = Config::default();
        config.set_simulation(Simulation {
            random_seed: 7,
            concurrency_limit: 3,
            run_infinitely: false,
            rounds: 12,
            vehicles: 4,
            sleep_min_sec: 0.1,
            sleep_max_sec: 0.3,
        });
        config.set_map(MapSize {
            x_size: 200,
            y_size: 50,
        });
        config.set_navigation(Navigation {
            destination_reached_threshold: 1,
            destination_weight: 4.,
            zone_return_weight: Some(2.),
        });

        let yaml = serde_yaml::to_string(&config).expect("Failed to serialize yaml");

        let parsed_config: Config = serde_yaml::from_str(&yaml).expect("failed to parse config");

        assert_eq!(parsed_config.simulation().random_seed, 7);
        assert_eq!(parsed_config.simulation().concurrency_limit, 3);
        assert_eq!(parsed_config.simulation().rounds, 12);
        assert_eq!(parsed_config.simulation().vehicles, 4);
        assert_eq!(parsed_config.map().x_size, 200);
        assert_eq!(parsed_config.map().y_size, 50);
        assert_eq!(parsed_config.navigation().zone_return_weight, Some(2.));
        // not set, so defaults apply
        assert_eq!(parsed_config.movement(), Movement::default());
    }

    #[test]
    fn read_partial_module() {
        let yaml = r#"
        modules:
          movement:
            type: Movement
            max_speed: 8
          tasks:
            type: Tasks
            fail_probability: 0.5
        "#;
        let parsed_config: Config = serde_yaml::from_str(yaml).expect("failed to parse config");
        assert_eq!(parsed_config.movement().max_speed, 8);
        assert_eq!(parsed_config.movement().turn_distance_base, 100);
        assert_eq!(parsed_config.movement().turn_distance_offset, 2);
        assert_eq!(parsed_config.tasks().fail_probability, 0.5);
        assert!(parsed_config.validate().is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker().online_probability, 0.8);
        assert_eq!(config.tracker().offline_probability, 0.2);
        assert_eq!(config.tasks().fail_probability, 0.95);
        assert_eq!(config.navigation().destination_reached_threshold, 3);
        assert_eq!(config.output().logging, Logging::None);
    }

    #[test]
    fn rejects_non_positive_map() {
        let mut config = Config::default();
        config.set_map(MapSize {
            x_size: 0,
            y_size: 10,
        });
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "map.x_size", .. }));
    }

    #[test]
    fn rejects_bad_movement_and_probabilities() {
        let mut config = Config::default();
        config.set_movement(Movement {
            max_speed: -1,
            ..Movement::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "movement.max_speed",
                ..
            })
        ));

        let mut config = Config::default();
        config.set_tasks(Tasks {
            fail_probability: 1.5,
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.set_tracker(Tracker {
            online_probability: 0.,
            offline_probability: 0.,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_sleep_range() {
        let mut config = Config::default();
        config.set_simulation(Simulation {
            sleep_min_sec: 2.,
            sleep_max_sec: 1.,
            ..Simulation::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "simulation.sleep_max_sec",
                ..
            })
        ));
    }

    #[test]
    fn rejects_module_with_wrong_type() {
        let yaml = r#"
        modules:
          map:
            type: Tasks
            fail_probability: 0.5
        "#;
        let parsed_config: Config = serde_yaml::from_str(yaml).expect("failed to parse config");
        assert!(matches!(
            parsed_config.validate(),
            Err(ConfigError::WrongModuleType { .. })
        ));
    }

    fn write_temp_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_override_from_args() {
        let yaml = r#"
modules:
  map:
    type: MapSize
    x_size: 100
    y_size: 100
  output:
    type: Output
    output_dir: out
"#;
        let file = write_temp_config(yaml);
        let args = CommandLineArgs {
            config: Some(file.path().to_path_buf()),
            overrides: vec![
                ("map.x_size".to_string(), "300".to_string()),
                ("output.write_telemetry".to_string(), "JsonLines".to_string()),
            ],
        };
        let config = Config::try_from(args).unwrap();
        assert_eq!(config.map().x_size, 300);
        assert_eq!(config.map().y_size, 100);
        assert_eq!(config.output().write_telemetry, WriteTelemetry::JsonLines);
        // relative output dir is resolved next to the config file
        assert_eq!(
            config.output_dir(),
            file.path().parent().unwrap().join("out")
        );
    }

    #[test]
    fn invalid_override_from_args_fails_fast() {
        let args = CommandLineArgs {
            config: None,
            overrides: vec![("map.y_size".to_string(), "-5".to_string())],
        };
        assert!(matches!(
            Config::try_from(args),
            Err(ConfigError::Invalid {
                key: "map.y_size",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = CommandLineArgs::new_with_path("/definitely/not/here.yml");
        assert!(matches!(Config::try_from(args), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn unparsable_override_value() {
        let mut config = Config::default();
        let result = config.apply_overrides(&[("movement.max_speed".to_string(), "fast".to_string())]);
        assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
    }

    #[test]
    fn unknown_override_is_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(&[("does.not_exist".to_string(), "1".to_string())])
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn override_zone_return_weight() {
        let mut config = Config::default();
        config
            .apply_overrides(&[("navigation.zone_return_weight".to_string(), "3.5".to_string())])
            .unwrap();
        assert_eq!(config.navigation().zone_return_weight, Some(3.5));
        config
            .apply_overrides(&[("navigation.zone_return_weight".to_string(), "none".to_string())])
            .unwrap();
        assert_eq!(config.navigation().zone_return_weight, None);
    }

    #[test]
    fn override_simulation_values() {
        let mut config = Config::default();
        config
            .apply_overrides(&[
                ("simulation.vehicles".to_string(), "25".to_string()),
                ("simulation.run_infinitely".to_string(), "true".to_string()),
                ("tracker.offline_probability".to_string(), "0.5".to_string()),
            ])
            .unwrap();
        assert_eq!(config.simulation().vehicles, 25);
        assert!(config.simulation().run_infinitely);
        assert_eq!(config.tracker().offline_probability, 0.5);
    }

    #[test]
    fn test_parse_key_val_valid() {
        let parsed = parse_key_val("map.x_size=20");
        assert_eq!(parsed, Ok(("map.x_size".to_string(), "20".to_string())));
    }

    #[test]
    fn test_parse_key_val_invalid() {
        assert!(parse_key_val("map.x_size_20").is_err());
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.set_output(Output {
            output_dir: PathBuf::from("elsewhere"),
            logging: Logging::Info,
            write_telemetry: WriteTelemetry::None,
        });
        super::write_config(&config, dir.path()).unwrap();

        let read = Config::from_file(&dir.path().join("output_config.yml")).unwrap();
        assert_eq!(read.output().logging, Logging::Info);
        assert_eq!(read.output().output_dir, PathBuf::from("elsewhere"));
    }
}
