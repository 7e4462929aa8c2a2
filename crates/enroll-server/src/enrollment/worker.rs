//! Admission-controlled worker pool
//!
//! A single loop pulls requests off the submission queue and launches each one
//! as its own task. A counting semaphore with `max_degree_of_parallelism`
//! permits caps how many jobs run at once: the loop takes a permit before it
//! pops a request, and the permit travels with the job and is released when
//! the job's task ends, however it ends.
//!
//! Shutdown stops the loop from popping further requests. Jobs that are
//! already running are left to finish and can be awaited through
//! [`WorkerPoolHandle::shutdown`].

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use super::{models::EnrollmentRequest, queue::EnrollmentConsumer};
use crate::config::EnrollmentConfig;

/// Work executed for each dequeued request
#[async_trait]
pub trait EnrollmentJob: Send + Sync + 'static {
    /// `true` when the request was fully processed
    async fn execute(&self, request: EnrollmentRequest) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub max_degree_of_parallelism: usize,
    /// Interval of the "no available slots" diagnostic while saturated
    pub no_available_slots_delay: Duration,
}

impl From<&EnrollmentConfig> for WorkerOptions {
    fn from(config: &EnrollmentConfig) -> Self {
        Self {
            max_degree_of_parallelism: config.max_degree_of_parallelism.max(1),
            no_available_slots_delay: config.no_available_slots_delay(),
        }
    }
}

pub struct WorkerPool<J> {
    job: Arc<J>,
    options: WorkerOptions,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<J: EnrollmentJob> WorkerPool<J> {
    pub fn new(job: Arc<J>, options: WorkerOptions, shutdown: CancellationToken) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_degree_of_parallelism.max(1)));

        Self {
            job,
            options,
            permits,
            tracker: TaskTracker::new(),
            shutdown,
        }
    }

    /// Spawn the dispatch loop
    pub fn start(self, consumer: EnrollmentConsumer) -> WorkerPoolHandle {
        let tracker = self.tracker.clone();
        let shutdown = self.shutdown.clone();
        let dispatcher = tokio::spawn(self.run(consumer));

        WorkerPoolHandle {
            dispatcher,
            tracker,
            shutdown,
        }
    }

    async fn run(self, mut consumer: EnrollmentConsumer) {
        info!(
            max_degree_of_parallelism = self.options.max_degree_of_parallelism,
            "Enrollment worker pool started"
        );

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                permit = self.acquire_permit() => match permit {
                    Some(permit) => permit,
                    None => break,
                },
            };

            let Some(request) = consumer.next(&self.shutdown).await else {
                break;
            };

            debug!(
                employer = %request.employer_name,
                in_flight = self.in_flight(),
                "Dispatching enrollment job"
            );

            let job = self.job.clone();
            self.tracker.spawn(async move {
                let _permit: OwnedSemaphorePermit = permit;
                job.execute(request).await;
            });
        }

        info!(pending = consumer.len(), "Enrollment worker pool stopped accepting work");
    }

    /// Wait for a free permit, logging periodically while the pool is full
    async fn acquire_permit(&self) -> Option<OwnedSemaphorePermit> {
        if let Ok(permit) = self.permits.clone().try_acquire_owned() {
            return Some(permit);
        }

        let delay = self.options.no_available_slots_delay;
        let acquire = self.permits.clone().acquire_owned();
        tokio::pin!(acquire);

        if delay.is_zero() {
            return acquire.await.ok();
        }

        loop {
            tokio::select! {
                permit = &mut acquire => return permit.ok(),
                _ = tokio::time::sleep(delay) => {
                    debug!(
                        max_degree_of_parallelism = self.options.max_degree_of_parallelism,
                        "No available slots, waiting for a running job to finish"
                    );
                },
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.options.max_degree_of_parallelism - self.permits.available_permits()
    }
}

/// Control over a started pool
pub struct WorkerPoolHandle {
    dispatcher: JoinHandle<()>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl WorkerPoolHandle {
    /// Jobs currently running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop dispatching and wait up to `grace` for running jobs
    ///
    /// Returns `true` when every running job finished in time.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.shutdown.cancel();

        if let Err(e) = self.dispatcher.await {
            warn!(error = %e, "Enrollment dispatcher ended abnormally");
        }

        self.tracker.close();
        let running = self.tracker.len();
        if running > 0 {
            info!(running, "Waiting for running enrollment jobs");
        }

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    still_running = self.tracker.len(),
                    "Shutdown grace period elapsed with jobs still running"
                );
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::queue;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    #[derive(Default)]
    struct CountingJob {
        running: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EnrollmentJob for CountingJob {
        async fn execute(&self, request: EnrollmentRequest) -> bool {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.employer_name);

            tokio::time::sleep(Duration::from_millis(20)).await;

            self.running.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct PanickingJob {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl EnrollmentJob for PanickingJob {
        async fn execute(&self, request: EnrollmentRequest) -> bool {
            if request.employer_name == "boom" {
                panic!("job failed");
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn options(max: usize) -> WorkerOptions {
        WorkerOptions {
            max_degree_of_parallelism: max,
            no_available_slots_delay: Duration::from_millis(5),
        }
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while counter.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs did not complete in time");
    }

    #[tokio::test]
    async fn test_running_jobs_never_exceed_parallelism() {
        let job = Arc::new(CountingJob::default());
        let (publisher, consumer) = queue::channel();
        let handle = WorkerPool::new(job.clone(), options(2), CancellationToken::new())
            .start(consumer);

        for i in 0..8 {
            publisher
                .publish(EnrollmentRequest::new("file.csv", format!("employer-{i}")))
                .unwrap();
        }

        wait_for(&job.completed, 8).await;
        assert!(handle.shutdown(Duration::from_secs(1)).await);
        assert_eq!(job.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_slot_processes_in_submission_order() {
        let job = Arc::new(CountingJob::default());
        let (publisher, consumer) = queue::channel();
        let handle = WorkerPool::new(job.clone(), options(1), CancellationToken::new())
            .start(consumer);

        for name in ["Acme", "Globex", "Initech"] {
            publisher
                .publish(EnrollmentRequest::new("file.csv", name))
                .unwrap();
        }

        wait_for(&job.completed, 3).await;
        handle.shutdown(Duration::from_secs(1)).await;
        assert_eq!(*job.seen.lock().unwrap(), vec!["Acme", "Globex", "Initech"]);
        assert_eq!(job.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_releases_its_slot() {
        let job = Arc::new(PanickingJob {
            completed: AtomicUsize::new(0),
        });
        let (publisher, consumer) = queue::channel();
        let handle = WorkerPool::new(job.clone(), options(1), CancellationToken::new())
            .start(consumer);

        publisher
            .publish(EnrollmentRequest::new("file.csv", "boom"))
            .unwrap();
        publisher
            .publish(EnrollmentRequest::new("file.csv", "Acme"))
            .unwrap();

        wait_for(&job.completed, 1).await;
        assert!(handle.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_shutdown_stops_dispatching() {
        let job = Arc::new(CountingJob::default());
        let (publisher, consumer) = queue::channel();
        let shutdown = CancellationToken::new();
        let handle = WorkerPool::new(job.clone(), options(2), shutdown.clone()).start(consumer);

        assert!(handle.shutdown(Duration::from_secs(1)).await);
        assert!(shutdown.is_cancelled());

        let _ = publisher.publish(EnrollmentRequest::new("file.csv", "Acme"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(job.completed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_options_clamp_parallelism() {
        let config = EnrollmentConfig {
            max_degree_of_parallelism: 0,
            ..EnrollmentConfig::default()
        };
        assert_eq!(WorkerOptions::from(&config).max_degree_of_parallelism, 1);
    }
}
