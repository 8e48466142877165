use std::fmt::Debug;
use std::thread;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{error, info};

pub mod telemetry;

/// This trait is a marker trait for requests that can be sent to an adapter.
pub trait RequestToAdapter: Debug + Send {}

/// Wraps the JoinHandle of an adapter thread together with the sender of its shutdown signal, so
/// that the adapter can be told to stop before joining it.
#[derive(Debug)]
pub struct AdapterHandle {
    pub(super) handle: JoinHandle<()>,
    pub(super) shutdown_sender: tokio::sync::watch::Sender<bool>,
}

impl AdapterHandle {
    /// Sends the shutdown signal and waits until the adapter has processed pending requests.
    pub fn shutdown_and_join(self) {
        let name = self.handle.thread().name().unwrap_or("adapter").to_string();
        // the adapter may have stopped already, in which case nobody listens anymore
        let _ = self.shutdown_sender.send(true);
        if self.handle.join().is_err() {
            error!("Adapter thread {name} panicked");
        }
    }
}

/// This trait defines a factory for creating request adapters.
pub trait RequestAdapterFactory<T: RequestToAdapter> {
    /// Builds the request adapter. Called on the adapter thread, inside its runtime.
    fn build(self) -> impl std::future::Future<Output = impl RequestAdapter<T>>;

    /// This method creates a channel for sending requests to the adapter.
    fn request_channel(&self, buffer: usize) -> (Sender<T>, Receiver<T>) {
        mpsc::channel(buffer)
    }

    /// This method creates a shutdown channel for the adapter.
    fn shutdown_channel(
        &self,
    ) -> (
        tokio::sync::watch::Sender<bool>,
        tokio::sync::watch::Receiver<bool>,
    ) {
        tokio::sync::watch::channel(false)
    }

    /// This method returns the number of threads used for the tokio runtime of the adapter.
    fn thread_count(&self) -> usize {
        1
    }
}

/// A request adapter processes incoming requests of type T. One adapter instance runs in a separate
/// thread with its own tokio runtime.
pub trait RequestAdapter<T: RequestToAdapter> {
    fn on_request(&mut self, req: T) -> impl std::future::Future<Output = ()>;
    fn on_shutdown(&mut self) {
        info!("Adapter is shutting down");
    }
}

/// Spawns a named thread running the adapter built by `factory`. Returns the handle of the thread
/// and the sender for requests.
pub fn spawn_adapter<T, F>(
    name: &str,
    factory: F,
    buffer: usize,
) -> std::io::Result<(AdapterHandle, Sender<T>)>
where
    T: RequestToAdapter + 'static,
    F: RequestAdapterFactory<T> + Send + 'static,
{
    let (send, recv) = factory.request_channel(buffer);
    let (send_sd, recv_sd) = factory.shutdown_channel();

    let handle = thread::Builder::new()
        .name(name.into())
        .spawn(move || execute_adapter(recv, factory, recv_sd))?;

    Ok((
        AdapterHandle {
            handle,
            shutdown_sender: send_sd,
        },
        send,
    ))
}

/// This function executes the adapter in the current thread with its own tokio runtime. It
/// returns when all senders are gone or when the shutdown signal arrives. On shutdown, requests
/// that are already queued are still processed.
pub fn execute_adapter<T: RequestToAdapter>(
    mut receiver: Receiver<T>,
    req_adapter_factory: impl RequestAdapterFactory<T>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    info!("Starting adapter");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(req_adapter_factory.thread_count().max(1))
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create runtime for adapter: {e}");
            return;
        }
    };

    rt.block_on(async move {
        let mut req_adapter = req_adapter_factory.build().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // a dropped shutdown sender counts as shutdown
                    if changed.is_ok() && !*shutdown.borrow() {
                        continue;
                    }
                    info!("Shutdown signal received, draining adapter.");
                    receiver.close();
                    while let Some(req) = receiver.recv().await {
                        req_adapter.on_request(req).await;
                    }
                    break;
                }
                maybe_req = receiver.recv() => {
                    match maybe_req {
                        Some(req) => req_adapter.on_request(req).await,
                        None => break,
                    }
                }
            }
        }
        req_adapter.on_shutdown();
    })
}
