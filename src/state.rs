use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::dispatch::Command;
use crate::engine::notifier::Notifier;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub command_tx: mpsc::Sender<Command>,
    pub notifier: Arc<Notifier>,
    pub outbox_buffer_size: usize,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        command_queue_size: usize,
        outbox_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<Command>) {
        let (command_tx, command_rx) = mpsc::channel(command_queue_size);
        let metrics = Metrics::new();

        (
            Self {
                command_tx,
                notifier: Arc::new(Notifier::new(metrics.clone())),
                outbox_buffer_size,
                metrics,
            },
            command_rx,
        )
    }
}
