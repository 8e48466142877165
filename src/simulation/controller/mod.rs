use crate::external_services::AdapterHandle;
use crate::simulation::config::Simulation;
use crate::simulation::random::get_rnd;
use crate::simulation::vehicles::vehicle::{Vehicle, VehicleError};
use ahash::HashMap;
use derive_builder::Builder;
use derive_more::Debug;
use rand::Rng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Summary of a fleet run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetReport {
    /// Vehicles that ran all their rounds or stopped because of shutdown.
    pub completed: usize,
    /// Vehicles that stopped because of an error or a panic.
    pub failed: usize,
    /// Execution steps over all vehicles.
    pub steps: u64,
}

/// Stops a running fleet. Steps in flight are finished, no new steps are started.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        info!("Shutting down fleet");
        self.sender.send_replace(true);
    }
}

#[derive(Debug, Builder)]
#[builder(pattern = "owned", build_fn(skip))]
pub struct FleetController {
    #[debug(skip)]
    vehicles: Vec<Vehicle>,
    simulation: Simulation,
    shutdown: Arc<watch::Sender<bool>>,
    adapter_handles: Vec<AdapterHandle>,
    shutdown_on_ctrl_c: bool,
}

impl FleetControllerBuilder {
    // Custom build function, so that the shutdown channel is created if not set by the user.
    pub fn build(self) -> Result<FleetController, String> {
        let simulation = self.simulation.ok_or("simulation is required")?;
        if simulation.concurrency_limit == 0 {
            return Err("simulation.concurrency_limit must be at least 1".to_string());
        }

        Ok(FleetController {
            vehicles: self.vehicles.unwrap_or_default(),
            simulation,
            shutdown: self
                .shutdown
                .unwrap_or_else(|| Arc::new(watch::channel(false).0)),
            adapter_handles: self.adapter_handles.unwrap_or_default(),
            shutdown_on_ctrl_c: self.shutdown_on_ctrl_c.unwrap_or(false),
        })
    }
}

/// What one vehicle loop produced.
struct VehicleRun {
    vehicle_id: Uuid,
    steps: u64,
    result: Result<(), VehicleError>,
}

impl FleetController {
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: self.shutdown.clone(),
        }
    }

    /// Runs the fleet on a new tokio runtime and shuts down the adapters afterwards.
    pub fn run(mut self) -> std::io::Result<FleetReport> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        if self.shutdown_on_ctrl_c {
            let handle = self.shutdown_handle();
            rt.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    handle.shutdown();
                }
            });
        }

        let report = rt.block_on(self.run_vehicles());

        // When all vehicles are finished, we shutdown the adapters.
        for adapter in std::mem::take(&mut self.adapter_handles) {
            adapter.shutdown_and_join();
        }
        Ok(report)
    }

    /// Runs all vehicles until they finished their rounds or the fleet is shut down. Vehicles are
    /// consumed, calling this a second time runs nothing.
    pub async fn run_vehicles(&mut self) -> FleetReport {
        let vehicles = std::mem::take(&mut self.vehicles);
        let rounds = (!self.simulation.run_infinitely).then_some(self.simulation.rounds);
        info!(
            "Starting fleet of {} vehicles, concurrency limit {}, rounds {:?}",
            vehicles.len(),
            self.simulation.concurrency_limit,
            rounds
        );

        let semaphore = Arc::new(Semaphore::new(self.simulation.concurrency_limit));
        let mut join_set = JoinSet::new();
        let mut ids = HashMap::default();

        for (index, vehicle) in vehicles.into_iter().enumerate() {
            let vehicle_id = vehicle.vehicle_id();
            let vehicle_loop = VehicleLoop {
                vehicle,
                rounds,
                sleep_min_sec: self.simulation.sleep_min_sec,
                sleep_max_sec: self.simulation.sleep_max_sec,
                semaphore: semaphore.clone(),
                shutdown: self.shutdown.subscribe(),
                rnd: get_rnd(self.simulation.random_seed, (index, "sleep")),
            };
            let span = info_span!("vehicle", id = %vehicle_id);
            let abort_handle = join_set.spawn(vehicle_loop.run().instrument(span));
            ids.insert(abort_handle.id(), vehicle_id);
        }

        let mut report = FleetReport::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(VehicleRun {
                    vehicle_id,
                    steps,
                    result,
                }) => {
                    report.steps += steps;
                    match result {
                        Ok(()) => report.completed += 1,
                        Err(e) => {
                            error!("Vehicle {vehicle_id} failed after {steps} steps: {e}");
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    let vehicle_id = ids.get(&e.id()).copied().unwrap_or_default();
                    error!("Vehicle {vehicle_id} aborted: {e}");
                    report.failed += 1;
                }
            }
        }

        info!(
            "Fleet finished: {} completed, {} failed, {} steps",
            report.completed, report.failed, report.steps
        );
        report
    }
}

struct VehicleLoop {
    vehicle: Vehicle,
    rounds: Option<u32>,
    sleep_min_sec: f64,
    sleep_max_sec: f64,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Receiver<bool>,
    rnd: SmallRng,
}

impl VehicleLoop {
    async fn run(mut self) -> VehicleRun {
        let mut steps = 0u64;
        let result = self.run_steps(&mut steps).await;
        VehicleRun {
            vehicle_id: self.vehicle.vehicle_id(),
            steps,
            result,
        }
    }

    async fn run_steps(&mut self, steps: &mut u64) -> Result<(), VehicleError> {
        loop {
            if self.stopped() {
                info!("Stopping after {} steps", steps);
                return Ok(());
            }
            if self.rounds_done(*steps) {
                info!("Finished all {} rounds", steps);
                return Ok(());
            }

            {
                let Ok(_permit) = self.semaphore.acquire().await else {
                    warn!("Semaphore closed, stopping");
                    return Ok(());
                };
                // shutdown may have arrived while waiting for the permit
                if self.stopped() {
                    info!("Stopping after {} steps", steps);
                    return Ok(());
                }
                let outcome = self.vehicle.run_execution_step()?;
                *steps += 1;
                debug!("Step {} finished: {:?}", steps, outcome);
                // the permit is dropped here, before sleeping
            }

            if self.rounds_done(*steps) {
                continue;
            }

            let secs = self
                .rnd
                .random_range(self.sleep_min_sec..=self.sleep_max_sec);
            let secs = (secs * 10.).round() / 10.;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => {}
                _ = self.shutdown.changed() => {}
            }
        }
    }

    fn rounds_done(&self, steps: u64) -> bool {
        self.rounds.is_some_and(|rounds| steps >= u64::from(rounds))
    }

    fn stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}
