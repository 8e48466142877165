use crate::external_services::{RequestAdapter, RequestAdapterFactory, RequestToAdapter};
use crate::simulation::telemetry::sender::{MessageSender, SendError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// One serialized tracking message on its way to the sink.
#[derive(Debug)]
pub struct TelemetryRecord {
    pub payload: String,
}

impl RequestToAdapter for TelemetryRecord {}

/// Forwards tracking messages into the request channel of a telemetry adapter. Never blocks the
/// vehicle: a full channel fails the send.
#[derive(Debug, Clone)]
pub struct ChannelMessageSender {
    sender: Sender<TelemetryRecord>,
}

impl ChannelMessageSender {
    pub fn new(sender: Sender<TelemetryRecord>) -> Self {
        Self { sender }
    }
}

impl MessageSender for ChannelMessageSender {
    fn send(&self, message: String) -> Result<(), SendError> {
        self.sender
            .try_send(TelemetryRecord { payload: message })
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::Full,
                TrySendError::Closed(_) => SendError::Closed,
            })
    }
}

/// Opens the telemetry file up front, so that a broken output directory fails at startup and
/// not on the adapter thread.
pub struct JsonLinesAdapterFactory {
    path: PathBuf,
    file: File,
}

impl JsonLinesAdapterFactory {
    pub fn create(output_dir: &Path) -> Result<Self, SendError> {
        let path = output_dir.join(TELEMETRY_FILE);
        let file = File::create(&path)?;
        info!("Writing telemetry to {path:?}");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RequestAdapterFactory<TelemetryRecord> for JsonLinesAdapterFactory {
    async fn build(self) -> impl RequestAdapter<TelemetryRecord> {
        JsonLinesAdapter {
            path: self.path,
            writer: BufWriter::new(self.file),
            written: 0,
        }
    }
}

/// Appends every record as one line to the telemetry file.
struct JsonLinesAdapter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl RequestAdapter<TelemetryRecord> for JsonLinesAdapter {
    async fn on_request(&mut self, req: TelemetryRecord) {
        match writeln!(self.writer, "{}", req.payload) {
            Ok(()) => self.written += 1,
            Err(e) => warn!("Failed to write telemetry record to {:?}: {e}", self.path),
        }
    }

    fn on_shutdown(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush telemetry file {:?}: {e}", self.path);
        }
        info!("Wrote {} telemetry records to {:?}", self.written, self.path);
    }
}
