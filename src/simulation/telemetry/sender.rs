use std::fmt::Debug;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("telemetry channel is closed")]
    Closed,
    #[error("telemetry channel is full")]
    Full,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Hands serialized tracking messages to whatever ingests them. Delivery is best effort, callers
/// do not retry.
pub trait MessageSender: Debug + Send + Sync {
    fn send(&self, message: String) -> Result<(), SendError>;
}

/// Writes every message into the log. Used when no telemetry sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessageSender;

impl MessageSender for TracingMessageSender {
    fn send(&self, message: String) -> Result<(), SendError> {
        info!(target: "telemetry", %message, "Sending tracking message");
        Ok(())
    }
}
