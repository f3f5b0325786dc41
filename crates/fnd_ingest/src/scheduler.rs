use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::pipeline::IngestionPipeline;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Runs the ingestion pipeline immediately and then every `interval`.
pub struct Scheduler {
    pipeline: Arc<IngestionPipeline>,
    interval: Duration,
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Number of cycles attempted so far, failed ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Stops the loop at its next wait and waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }
}

impl Scheduler {
    pub fn new(pipeline: Arc<IngestionPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let cycles = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(self.run(receiver, cycles.clone()));
        SchedulerHandle { shutdown, cycles, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, cycles: Arc<AtomicU64>) {
        info!("⏰ Scheduler started, interval {:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.pipeline.run_cycle().await {
                Ok(report) => info!(
                    "⏰ Scheduled cycle created {} articles across {} categories",
                    report.created(),
                    report.categories.len()
                ),
                Err(e) => error!("⏰ Scheduled cycle failed: {}", e),
            }
            cycles.fetch_add(1, Ordering::SeqCst);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("⏰ Scheduler stopped");
    }
}
