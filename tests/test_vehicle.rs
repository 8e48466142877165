use fleet_sim::simulation::config::{Config, Tracker};
use fleet_sim::simulation::geometry::{Direction, Location};
use fleet_sim::simulation::map::NavigationMap;
use fleet_sim::simulation::random::get_rnd;
use fleet_sim::simulation::telemetry::schema::{
    SchemaError, TelemetrySchema, VehicleTrackingSchemaV1,
};
use fleet_sim::simulation::telemetry::sender::{MessageSender, SendError};
use fleet_sim::simulation::telemetry::VehicleTrackingMessage;
use fleet_sim::simulation::vehicles::destination::BasicDestinationTracker;
use fleet_sim::simulation::vehicles::factory::{
    VehicleFactory, VehicleOptions, VehicleOptionsBuilder,
};
use fleet_sim::simulation::vehicles::heading::{HeadingDirectionManager, NavigationView};
use fleet_sim::simulation::vehicles::navigation::NavigationManager;
use fleet_sim::simulation::vehicles::tasks::{TaskState, TasksManager};
use fleet_sim::simulation::vehicles::tracker::{TrackerManager, Transmission};
use fleet_sim::simulation::vehicles::vehicle::{StepOutcome, Vehicle};
use fleet_sim::simulation::vehicles::zone::{AllowedZoneManager, BasicAllowedZoneManager};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct CollectingSender(Mutex<Vec<String>>);

impl CollectingSender {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl MessageSender for CollectingSender {
    fn send(&self, message: String) -> Result<(), SendError> {
        self.0.lock().unwrap().push(message);
        Ok(())
    }
}

fn map() -> Arc<NavigationMap> {
    Arc::new(NavigationMap::new(100, 100).unwrap())
}

fn schema(map: &NavigationMap) -> Arc<VehicleTrackingSchemaV1> {
    Arc::new(VehicleTrackingSchemaV1::for_map(map))
}

fn always_online(config: &mut Config) {
    config.set_tracker(Tracker {
        online_probability: 1.,
        offline_probability: 0.,
    });
}

fn factory(config: &Config, sender: Arc<CollectingSender>) -> VehicleFactory {
    let map = map();
    let schema = schema(&map);
    VehicleFactory::from_config(config, map, schema, sender)
}

/// A vehicle whose tasks and navigation already share `destination`.
fn vehicle_with_task(
    f: &VehicleFactory,
    options: &VehicleOptions,
    destination: Location,
) -> Vehicle {
    let mut tasks = f.create_tasks_manager(0, options).unwrap();
    tasks.initialize_new_task(destination);
    let mut navigation = f.create_navigation_manager(0, options).unwrap();
    navigation.initialize_new_task(destination);
    Vehicle::new(
        Box::new(navigation),
        Box::new(tasks),
        Box::new(f.create_tracker_manager(0, options)),
    )
}

#[test]
fn vehicle_moves_towards_task() {
    let sender = Arc::new(CollectingSender::default());
    let mut config = Config::default();
    always_online(&mut config);
    let f = factory(&config, sender.clone());
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(0.)
        .build()
        .unwrap();

    let destination = Location::new(100, 100);
    let mut vehicle = vehicle_with_task(&f, &options, destination);
    assert_eq!(vehicle.current_location(), Location::new(1, 1));
    assert_eq!(vehicle.current_task_state(), TaskState::InProgress);

    for _ in 0..2 {
        let outcome = vehicle.run_execution_step().unwrap();
        assert_eq!(outcome, StepOutcome::Moved(Transmission::Sent));
    }
    assert_ne!(vehicle.current_location(), Location::new(1, 1));
    assert_eq!(vehicle.current_task_state(), TaskState::InProgress);
    assert_eq!(vehicle.navigation().destination(), destination);

    let messages = sender.messages();
    assert_eq!(messages.len(), 2);
    let message = schema(f.nav_map()).validate_json(&messages[1]).unwrap();
    assert_eq!(message.vehicle_id, vehicle.vehicle_id());
    assert_eq!(message.task_state, TaskState::InProgress);
    assert_eq!(message.destination, destination);
    assert_eq!(message.vehicle_location, vehicle.current_location());
}

#[test]
fn idle_vehicle_accepts_task_without_moving() {
    let sender = Arc::new(CollectingSender::default());
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(0.)
        .build()
        .unwrap();
    let mut vehicle = factory(&Config::default(), sender.clone())
        .create_vehicle(0, options)
        .unwrap();

    let outcome = vehicle.run_execution_step().unwrap();
    let StepOutcome::TaskAccepted(task) = outcome else {
        panic!("expected a task, got {outcome:?}");
    };
    assert_eq!(vehicle.current_location(), Location::new(1, 1));
    assert_eq!(vehicle.current_task_state(), TaskState::InProgress);
    assert_eq!(vehicle.navigation().destination(), task);
    assert!(sender.messages().is_empty());
}

#[test]
fn relocated_vehicle_is_out_of_zone() {
    let f = factory(&Config::default(), Arc::new(CollectingSender::default()));
    let options = VehicleOptions::default();
    let mut vehicle = vehicle_with_task(&f, &options, Location::new(10, 10));

    vehicle
        .navigation_mut()
        .override_current_location(Location::new(-5, 10));
    assert_eq!(vehicle.current_location(), Location::new(-5, 10));
    assert!(vehicle.navigation().out_of_zone());
    assert_eq!(vehicle.navigation().zone_borders_breached(), &[Direction::Left]);
}

#[test]
fn never_leaves_idle_without_tasks() {
    let sender = Arc::new(CollectingSender::default());
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(1.)
        .build()
        .unwrap();
    let mut vehicle = factory(&Config::default(), sender.clone())
        .create_vehicle(0, options)
        .unwrap();
    for _ in 0..50 {
        assert_eq!(vehicle.run_execution_step().unwrap(), StepOutcome::NoTask);
        assert_eq!(vehicle.current_task_state(), TaskState::Idle);
    }
    assert_eq!(vehicle.current_location(), Location::new(1, 1));
    assert!(sender.messages().is_empty());
}

#[test]
fn reaches_close_destination() {
    let sender = Arc::new(CollectingSender::default());
    let mut config = Config::default();
    always_online(&mut config);
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(0.)
        .initial_location(Location::new(50, 50))
        .build()
        .unwrap();
    // a destination within the threshold is reached by the next step
    let mut vehicle = vehicle_with_task(
        &factory(&config, sender),
        &options,
        Location::new(52, 49),
    );

    let outcome = vehicle.run_execution_step().unwrap();
    assert_eq!(outcome, StepOutcome::DestinationReached(Transmission::Sent));
    assert_eq!(vehicle.current_task_state(), TaskState::Idle);
    assert_eq!(vehicle.current_location(), Location::new(50, 50));
}

#[test]
fn offline_tracker_drops_messages() {
    let sender = Arc::new(CollectingSender::default());
    let mut config = Config::default();
    config.set_tracker(Tracker {
        online_probability: 0.,
        offline_probability: 1.,
    });
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(0.)
        .build()
        .unwrap();
    let mut vehicle = vehicle_with_task(
        &factory(&config, sender.clone()),
        &options,
        Location::new(90, 90),
    );
    assert_eq!(
        vehicle.run_execution_step().unwrap(),
        StepOutcome::Moved(Transmission::Offline)
    );
    assert!(sender.messages().is_empty());
}

#[test]
fn snapshot_from_components_validates() {
    let sender = Arc::new(CollectingSender::default());
    let f = factory(&Config::default(), sender);
    let options = VehicleOptionsBuilder::default()
        .task_fail_probability(0.)
        .build()
        .unwrap();
    let mut navigation = f.create_navigation_manager(0, &options).unwrap();
    let mut tasks = f.create_tasks_manager(0, &options).unwrap();
    let tracker = f.create_tracker_manager(0, &options);

    let task = tasks.get_new_task().unwrap();
    tasks.initialize_new_task(task);
    navigation.initialize_new_task(task);
    navigation.move_to_destination().unwrap();

    let data = tracker.collect_tracking_data(&tasks, &navigation);
    assert_eq!(data.vehicle_location, navigation.current_location());
    assert_eq!(data.destination, task);
    assert_eq!(data.task_state, TaskState::InProgress);

    let schema = schema(f.nav_map());
    let mut message = VehicleTrackingMessage::new(tracker.vehicle_id(), data);
    assert!(schema.validate(&message).is_ok());

    message.vehicle_speed = -1;
    assert!(matches!(
        schema.validate(&message),
        Err(SchemaError::NegativeSpeed(-1))
    ));
}

#[test]
fn infinite_distance_is_rejected() {
    let sender = Arc::new(CollectingSender::default());
    let mut config = Config::default();
    always_online(&mut config);
    let f = factory(&config, sender.clone());
    let options = Default::default();
    let navigation = f.create_navigation_manager(0, &options).unwrap();
    let tasks = f.create_tasks_manager(0, &options).unwrap();
    let mut tracker = f.create_tracker_manager(0, &options);

    // no destination has been measured yet
    tracker.update();
    let transmission = tracker.send_tracking_data(&tasks, &navigation);
    assert!(matches!(transmission, Transmission::Rejected(_)));
    assert!(sender.messages().is_empty());
}

#[test]
fn no_providers_draw_uniformly() {
    let map = NavigationMap::new(100, 100).unwrap();
    let destination = BasicDestinationTracker::new(3);
    let mut zone = BasicAllowedZoneManager::new();
    zone.update_state(Location::new(1, 1), &map);
    let view = NavigationView {
        location: Location::new(1, 1),
        map: &map,
        destination: &destination,
        zone: &zone as &dyn AllowedZoneManager,
    };

    let mut manager = HeadingDirectionManager::new(get_rnd(42, "uniform"));
    let draws = 40_000;
    let mut counts = [0usize; 4];
    for _ in 0..draws {
        let direction = manager.update_heading_direction(&view).unwrap();
        let index = Direction::ALL.iter().position(|d| *d == direction).unwrap();
        counts[index] += 1;
    }
    for (direction, count) in Direction::ALL.iter().zip(counts) {
        let share = count as f64 / draws as f64;
        assert!((share - 0.25).abs() < 0.02, "{direction}: {share}");
    }
}
