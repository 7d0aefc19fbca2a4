// crates/sqlserial-core/src/runtime/engine.rs
// ============================================================================
// Module: SQL Serial Engine
// Description: Submission, lifecycle, and shared state for the executor.
// Purpose: Serialize every operation onto one storage connection.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`Engine`] owns the FIFO queue, the result table, and the two background
//! threads (executor and sweeper). Callers submit an [`Operation`] together
//! with a [`WaitHandle`], receive an [`OperationId`], wait on the handle, and
//! then read the outcome with [`Engine::get_result`]. The blocking helpers in
//! the facade module wrap that sequence.
//!
//! Ids are assigned, the pending entry is recorded, and the operation is
//! enqueued while the submission lock is held, so queue order always equals
//! id order.
//!
//! Security posture: SQL text is executed verbatim; callers must bind
//! untrusted input as parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Clock;
use crate::core::Operation;
use crate::core::OperationId;
use crate::core::SystemClock;
use crate::interfaces::Storage;
use crate::runtime::config::EngineConfig;
use crate::runtime::error::EngineError;
use crate::runtime::error::OperationOutcome;
use crate::runtime::executor::QueuedOperation;
use crate::runtime::executor::run_executor;
use crate::runtime::sweeper::SweeperHandle;
use crate::runtime::table::ResultTable;
use crate::runtime::wait::WaitHandle;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Monotonic counters exposed through [`EngineStats`].
#[derive(Debug, Default)]
struct Counters {
    /// Operations accepted by `submit`.
    submitted: AtomicU64,
    /// Operations that completed with rows.
    succeeded: AtomicU64,
    /// Operations that completed with a storage error.
    failed: AtomicU64,
    /// Operations drained with `ShuttingDown`.
    shut_down: AtomicU64,
    /// Completed entries removed by sweeps.
    swept: AtomicU64,
}

/// State shared by the engine, the executor, and the sweeper.
pub(crate) struct EngineShared {
    /// Operation results.
    pub(crate) table: ResultTable,
    /// Time source for completion stamps and sweeps.
    clock: Arc<dyn Clock>,
    /// Set once `close` runs; never cleared.
    shutting_down: AtomicBool,
    /// Operations enqueued but not yet dequeued by the executor.
    queue_depth: AtomicUsize,
    /// Lifetime counters.
    counters: Counters,
}

impl EngineShared {
    /// Returns true once shutdown has begun.
    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Records that `count` operations left the queue.
    pub(crate) fn dequeued(&self, count: usize) {
        self.queue_depth.fetch_sub(count, Ordering::AcqRel);
    }

    /// Publishes one outcome and wakes its waiter.
    pub(crate) fn publish(&self, id: OperationId, outcome: OperationOutcome) {
        let counter = self.counter_for(&outcome);
        if let Some(handle) = self.table.complete(id, outcome, self.clock.now()) {
            counter.fetch_add(1, Ordering::Relaxed);
            handle.signal();
        }
    }

    /// Publishes `ShuttingDown` for every id in `ids`; returns how many woke.
    pub(crate) fn publish_shutdown(&self, ids: &[OperationId]) -> usize {
        let outcome = Err(EngineError::ShuttingDown);
        let handles = self.table.complete_many(ids, &outcome, self.clock.now());
        self.count_outcome(&outcome, handles.len() as u64);
        for handle in &handles {
            handle.signal();
        }
        handles.len()
    }

    /// Completes every pending entry with `error`; returns how many woke.
    fn fail_all_pending(&self, error: EngineError) -> usize {
        let outcome = Err(error);
        let handles = self.table.complete_all_pending(&outcome, self.clock.now());
        self.count_outcome(&outcome, handles.len() as u64);
        for handle in &handles {
            handle.signal();
        }
        handles.len()
    }

    /// Removes completed entries older than `retention`.
    pub(crate) fn sweep(&self, retention: Duration) -> usize {
        let removed = self.table.sweep(self.clock.now(), retention);
        self.counters.swept.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            debug!(removed, "swept expired results");
        }
        removed
    }

    /// Bumps the counter matching `outcome`.
    fn count_outcome(&self, outcome: &OperationOutcome, count: u64) {
        self.counter_for(outcome).fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the counter that tracks outcomes shaped like `outcome`.
    fn counter_for(&self, outcome: &OperationOutcome) -> &AtomicU64 {
        match outcome {
            Ok(_) => &self.counters.succeeded,
            Err(EngineError::ShuttingDown) => &self.counters.shut_down,
            Err(_) => &self.counters.failed,
        }
    }
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Operations accepted by `submit`.
    pub submitted: u64,
    /// Operations that completed with rows.
    pub succeeded: u64,
    /// Operations that completed with an error other than shutdown.
    pub failed: u64,
    /// Operations drained with `ShuttingDown`.
    pub shut_down: u64,
    /// Completed entries removed by sweeps.
    pub swept: u64,
    /// Table entries still pending.
    pub pending: usize,
    /// Table entries holding an unread or retained outcome.
    pub completed: usize,
    /// Operations waiting in the queue.
    pub queue_depth: usize,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Submission side of the queue.
struct Submission {
    /// Id for the next accepted operation; `None` once exhausted.
    next_id: Option<OperationId>,
    /// Queue sender; dropped by `close`.
    sender: Option<mpsc::Sender<QueuedOperation>>,
}

/// Resources handed to the executor thread by `start`.
struct Startup {
    /// Queue receiver.
    receiver: mpsc::Receiver<QueuedOperation>,
    /// The storage connection.
    storage: Box<dyn Storage>,
}

/// Background threads owned by a started engine.
#[derive(Default)]
struct Threads {
    /// Executor thread.
    executor: Option<JoinHandle<()>>,
    /// Sweeper thread.
    sweeper: Option<SweeperHandle>,
}

/// Serialized-access execution engine.
///
/// # Invariants
/// - At most one operation executes against the storage at a time.
/// - Operations execute in submission order.
/// - Every accepted operation's waiter is signalled exactly once, including
///   on failure and at shutdown.
pub struct Engine {
    /// Validated configuration.
    config: EngineConfig,
    /// State shared with background threads.
    shared: Arc<EngineShared>,
    /// Id counter and queue sender.
    submission: Mutex<Submission>,
    /// Executor resources until `start` consumes them.
    startup: Mutex<Option<Startup>>,
    /// Background thread handles.
    threads: Mutex<Threads>,
}

impl Engine {
    /// Creates an engine over `storage` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when `config` fails validation.
    pub fn new<S: Storage>(storage: S, config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when `config` fails validation.
    pub fn with_clock<S: Storage>(
        storage: S,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(EngineShared {
            table: ResultTable::new(),
            clock,
            shutting_down: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            counters: Counters::default(),
        });
        Ok(Self {
            config,
            shared,
            submission: Mutex::new(Submission {
                next_id: Some(OperationId::FIRST),
                sender: Some(sender),
            }),
            startup: Mutex::new(Some(Startup {
                receiver,
                storage: Box::new(storage),
            })),
            threads: Mutex::new(Threads::default()),
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Launches the executor and sweeper threads.
    ///
    /// Operations submitted before `start` stay queued and run once the
    /// executor is up.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStarted`] on a second call,
    /// [`EngineError::ShuttingDown`] after `close`, and
    /// [`EngineError::Runtime`] when a thread cannot be spawned.
    pub fn start(&self) -> Result<(), EngineError> {
        let startup = lock(&self.startup).take();
        let Some(Startup {
            receiver,
            storage,
        }) = startup
        else {
            if self.shared.is_shutting_down() {
                return Err(EngineError::ShuttingDown);
            }
            return Err(EngineError::AlreadyStarted);
        };
        let label = storage.label().to_string();
        let shared = Arc::clone(&self.shared);
        let executor = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || run_executor(&shared, &receiver, storage));
        let executor = match executor {
            Ok(executor) => executor,
            Err(err) => {
                let error = EngineError::Runtime(format!("failed to spawn executor: {err}"));
                self.abandon(error.clone());
                return Err(error);
            }
        };
        lock(&self.threads).executor = Some(executor);

        let sweeper = SweeperHandle::spawn(
            Arc::clone(&self.shared),
            format!("{}-sweeper", self.config.worker_name),
            self.config.sweep_interval(),
            self.config.retention(),
        );
        match sweeper {
            Ok(sweeper) => lock(&self.threads).sweeper = Some(sweeper),
            Err(err) => {
                warn!(error = %err, "failed to spawn sweeper; results are only swept on demand");
            }
        }
        if self.shared.is_shutting_down() {
            // `close` may have run before the sweeper was stored.
            let sweeper = lock(&self.threads).sweeper.take();
            if let Some(sweeper) = sweeper {
                sweeper.stop();
            }
        }
        info!(
            storage = %label,
            retention_ms = self.config.retention_ms,
            sweep_interval_ms = self.config.sweep_interval_ms,
            "engine started"
        );
        Ok(())
    }

    /// Enqueues `operation` and records `handle` as its waiter.
    ///
    /// Returns immediately; the operation has not necessarily executed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShuttingDown`] once `close` has begun,
    /// [`EngineError::HandleInUse`] when `handle` was already submitted or
    /// signalled, and [`EngineError::Runtime`] when the id space is exhausted.
    pub fn submit(
        &self,
        operation: impl Into<Operation>,
        handle: &WaitHandle,
    ) -> Result<OperationId, EngineError> {
        if self.shared.is_shutting_down() {
            return Err(EngineError::ShuttingDown);
        }
        let operation = operation.into();
        let statements = operation.statements().len();
        let mut submission = lock(&self.submission);
        let Some(id) = submission.next_id else {
            return Err(EngineError::Runtime("operation id space exhausted".to_string()));
        };
        let Some(sender) = submission.sender.as_ref() else {
            return Err(EngineError::ShuttingDown);
        };
        if !handle.claim() {
            return Err(EngineError::HandleInUse);
        }
        self.shared.table.insert_pending(id, handle.clone());
        self.shared.queue_depth.fetch_add(1, Ordering::AcqRel);
        if sender
            .send(QueuedOperation {
                id,
                operation,
            })
            .is_err()
        {
            // Executor is gone; the entry still gets a terminal outcome.
            self.shared.dequeued(1);
            warn!(operation_id = %id, "executor unavailable; failing operation");
            self.shared.publish(id, Err(EngineError::ShuttingDown));
        }
        submission.next_id = id.next();
        drop(submission);
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(operation_id = %id, statements, "operation submitted");
        Ok(id)
    }

    /// Returns the outcome of `id` once it has completed.
    ///
    /// `None` means the operation is still pending, the id was never issued,
    /// or its result was swept.
    #[must_use]
    pub fn get_result(&self, id: OperationId) -> Option<OperationOutcome> {
        self.shared.table.get(id)
    }

    /// Returns true while `id` is waiting for execution.
    #[must_use]
    pub fn is_pending(&self, id: OperationId) -> bool {
        self.shared.table.is_pending(id)
    }

    /// Stops accepting submissions and tells the executor to drain.
    ///
    /// The operation currently executing finishes normally; everything still
    /// queued completes with [`EngineError::ShuttingDown`]. Idempotent.
    pub fn close(&self) {
        if self.shared.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("engine closing");
        drop(lock(&self.submission).sender.take());
        if let Some(startup) = lock(&self.startup).take() {
            drop(startup);
            let drained = self.shared.fail_all_pending(EngineError::ShuttingDown);
            info!(drained, "engine closed before start");
        }
        let sweeper = lock(&self.threads).sweeper.take();
        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
    }

    /// Waits for the executor thread to finish draining.
    pub fn join(&self) {
        let executor = lock(&self.threads).executor.take();
        if let Some(executor) = executor
            && executor.join().is_err()
        {
            warn!("executor thread panicked");
        }
    }

    /// Closes the engine and waits for the executor.
    pub fn shutdown(&self) {
        self.close();
        self.join();
    }

    /// Runs one sweep immediately; returns the number of removed results.
    pub fn sweep_now(&self) -> usize {
        self.shared.sweep(self.config.retention())
    }

    /// Returns current statistics.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let counts = self.shared.table.counts();
        let counters = &self.shared.counters;
        EngineStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            shut_down: counters.shut_down.load(Ordering::Relaxed),
            swept: counters.swept.load(Ordering::Relaxed),
            pending: counts.pending,
            completed: counts.completed,
            queue_depth: self.shared.queue_depth.load(Ordering::Acquire),
        }
    }

    /// Fails every pending operation after the executor could not start.
    fn abandon(&self, error: EngineError) {
        self.shared.shutting_down.store(true, Ordering::Release);
        drop(lock(&self.submission).sender.take());
        let failed = self.shared.fail_all_pending(error);
        warn!(failed, "engine abandoned before the executor started");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("shutting_down", &self.shared.is_shutting_down())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Locks a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
