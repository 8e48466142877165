use clap::Parser;
use fleet_sim::external_services::telemetry::{ChannelMessageSender, JsonLinesAdapterFactory};
use fleet_sim::external_services::spawn_adapter;
use fleet_sim::simulation::config::{write_config, CommandLineArgs, Config, WriteTelemetry};
use fleet_sim::simulation::controller::FleetControllerBuilder;
use fleet_sim::simulation::logging::{init_logging, init_std_out_logging_thread_local};
use fleet_sim::simulation::map::NavigationMap;
use fleet_sim::simulation::telemetry::schema::{TelemetrySchema, VehicleTrackingSchemaV1};
use fleet_sim::simulation::telemetry::sender::{MessageSender, TracingMessageSender};
use fleet_sim::simulation::vehicles::factory::VehicleFactory;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    let guard = init_std_out_logging_thread_local();

    let args = CommandLineArgs::parse();
    info!("Started with args: {:?}", args);

    // Load, override and validate the config. Any problem ends the program here.
    let config = Config::try_from(args)?;

    let output_path = config.output_dir();
    fs::create_dir_all(&output_path)?;

    // from here on vehicles log from the runtime's worker threads
    drop(guard);
    let _guards = init_logging(&config)?;
    write_config(&config, &output_path)?;

    let map_size = config.map();
    let nav_map = Arc::new(NavigationMap::new(map_size.x_size, map_size.y_size)?);
    let schema: Arc<dyn TelemetrySchema> = Arc::new(VehicleTrackingSchemaV1::for_map(&nav_map));

    let mut adapters = Vec::new();
    let sender: Arc<dyn MessageSender> = match config.output().write_telemetry {
        WriteTelemetry::JsonLines => {
            let factory = JsonLinesAdapterFactory::create(&output_path)?;
            let (adapter, send) = spawn_adapter("telemetry", factory, 10_000)?;
            adapters.push(adapter);
            Arc::new(ChannelMessageSender::new(send))
        }
        WriteTelemetry::None => Arc::new(TracingMessageSender),
    };

    let factory = VehicleFactory::from_config(&config, nav_map, schema, sender);
    let vehicles = factory.create_fleet(config.simulation().vehicles)?;

    let controller = FleetControllerBuilder::default()
        .vehicles(vehicles)
        .simulation(config.simulation())
        .adapter_handles(adapters)
        .shutdown_on_ctrl_c(true)
        .build()?;

    let report = controller.run()?;
    info!(
        "Simulation finished: {} vehicles completed, {} failed, {} steps",
        report.completed, report.failed, report.steps
    );
    Ok(())
}
