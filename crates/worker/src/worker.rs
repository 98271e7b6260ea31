// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker runtime: fetch loops, lock renewal, stall checks, and the
//! backoff/retry/dead-letter router.

use crate::breaker::{CircuitBreaker, CircuitState, CircuitTransition};
use crate::dlq::route_to_dlq;
use crate::logger::{level_for, LifecycleEntry};
use crate::options::WorkerOptions;
use crate::WorkerError;
use grist_conn::{connect, connect_blocking, probe_server};
use grist_core::backoff::compute_backoff;
use grist_core::clock::{Clock, SystemClock};
use grist_core::event::Event;
use grist_core::job::Job;
use grist_core::keys::KeySpace;
use grist_core::opts::{BackoffOpts, RemovePolicy};
use grist_queue::compensation::COMPENSATION_FIELD;
use grist_queue::dispatch_compensations;
use grist_scripts::{
    FetchResult, FinishOutcome, FinishSpec, FinishTarget, RuntimeArgs, StateEngine,
};
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors a processor may raise.
#[derive(Debug, Clone)]
pub enum ProcessError {
    /// Terminal immediately: retries are skipped and the job is routed to
    /// the DLQ when one is configured.
    Unrecoverable { message: String },
    /// Consumed by the backoff/retry router.
    Transient {
        /// Runtime error name, matched against `errorBackoffs` overrides.
        name: Option<String>,
        message: String,
    },
}

impl ProcessError {
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self::Unrecoverable { message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient { name: None, message: message.into() }
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient { name: Some(name.into()), message: message.into() }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unrecoverable { .. } => Some("UnrecoverableError"),
            Self::Transient { name, .. } => name.as_deref(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unrecoverable { message } | Self::Transient { message, .. } => message,
        }
    }

    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Unrecoverable { .. })
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ProcessError {}

/// Handle passed to the processor for in-flight interactions.
#[derive(Clone)]
pub struct JobContext {
    engine: StateEngine,
    job_id: String,
    token: String,
    lock_duration_ms: u64,
    keep_logs: u64,
}

impl JobContext {
    pub async fn update_progress(&self, progress: &Value) -> Result<(), WorkerError> {
        Ok(self.engine.update_progress(&self.job_id, progress).await?)
    }

    pub async fn log(&self, row: &str) -> Result<u64, WorkerError> {
        Ok(self.engine.add_log(&self.job_id, row, self.keep_logs).await?)
    }

    /// Manually extend this job's lock (long CPU-bound sections).
    pub async fn extend_lock(&self) -> Result<(), WorkerError> {
        let renewed = self
            .engine
            .extend_lock(&self.job_id, &self.token, self.lock_duration_ms)
            .await?;
        if !renewed {
            return Err(WorkerError::UnrenewedLock(self.job_id.clone()));
        }
        Ok(())
    }

    /// Park this job until its remaining dependencies resolve.
    ///
    /// Returns `true` when parked (the processor must stop working on the
    /// job), `false` when no dependencies remain.
    pub async fn move_to_waiting_children(&self) -> Result<bool, WorkerError> {
        Ok(self.engine.move_to_waiting_children(&self.job_id, &self.token).await?)
    }

    /// Return values of settled children, keyed by full child job key.
    pub async fn children_values(
        &self,
    ) -> Result<std::collections::HashMap<String, Value>, WorkerError> {
        let mut conn = self.engine.connection();
        let raw: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.engine.keys().processed(&self.job_id))
            .query_async(&mut conn)
            .await?;
        let mut values = HashMap::with_capacity(raw.len());
        for (child_key, value) in raw {
            let value = serde_json::from_str(&value).unwrap_or(Value::Null);
            values.insert(child_key, value);
        }
        Ok(values)
    }
}

pub type ProcessorFuture = Pin<Box<dyn Future<Output = Result<Value, ProcessError>> + Send>>;

/// The user processor: `(job, context) -> returnvalue`.
pub type Processor = Arc<dyn Fn(Job, JobContext) -> ProcessorFuture + Send + Sync>;

struct Shared<C: Clock> {
    queue: String,
    engine: StateEngine,
    blocking: tokio::sync::Mutex<redis::aio::ConnectionManager>,
    options: WorkerOptions,
    processor: Processor,
    token: String,
    breaker: Option<Arc<CircuitBreaker>>,
    /// In-flight jobs: id -> cancellation handle fired on lock loss.
    active: Mutex<HashMap<String, CancellationToken>>,
    shutdown: CancellationToken,
    closing: AtomicBool,
    clock: C,
}

/// A queue consumer holding a per-worker lock token.
pub struct Worker<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
    tasks: Mutex<JoinSet<()>>,
    started: AtomicBool,
}

impl Worker<SystemClock> {
    /// Connect a worker; with `autorun` the loops start immediately.
    pub async fn start(
        queue: impl Into<String>,
        processor: Processor,
        options: WorkerOptions,
    ) -> Result<Self, WorkerError> {
        let worker = Self::connect_with_clock(queue, processor, options, SystemClock).await?;
        if worker.shared.options.autorun {
            worker.run();
        }
        Ok(worker)
    }
}

impl<C: Clock + 'static> Worker<C> {
    pub async fn connect_with_clock(
        queue: impl Into<String>,
        processor: Processor,
        options: WorkerOptions,
        clock: C,
    ) -> Result<Self, WorkerError> {
        options.validate()?;
        let queue = queue.into();
        let mut conn = connect(&options.conn).await?;
        let version = probe_server(&mut conn).await?;
        let blocking = connect_blocking(&options.conn).await?;

        let keys = if options.clustered {
            KeySpace::clustered(&options.prefix, &queue)
        } else {
            KeySpace::new(&options.prefix, &queue)
        };
        let engine = StateEngine::new(conn, keys, version.supports_lpos());

        let breaker = options.circuit_breaker.clone().map(CircuitBreaker::new);
        if let Some(breaker) = &breaker {
            let events_engine = engine.clone();
            breaker.set_on_transition(Box::new(move |transition| {
                let event = match transition {
                    CircuitTransition::Opened { failures, threshold } => {
                        Event::CircuitOpen { failures, threshold }
                    }
                    CircuitTransition::HalfOpened => Event::CircuitHalfOpen,
                    CircuitTransition::Closed { test_job_id } => {
                        Event::CircuitClosed { test_job_id }
                    }
                };
                tokio::spawn(emit_stream_event(events_engine.clone(), event));
            }));
        }

        let shared = Arc::new(Shared {
            queue,
            engine,
            blocking: tokio::sync::Mutex::new(blocking),
            options,
            processor,
            token: Uuid::new_v4().to_string(),
            breaker,
            active: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            closing: AtomicBool::new(false),
            clock,
        });
        Ok(Self { shared, tasks: Mutex::new(JoinSet::new()), started: AtomicBool::new(false) })
    }

    pub fn queue(&self) -> &str {
        &self.shared.queue
    }

    /// This worker's lock token.
    pub fn token(&self) -> &str {
        &self.shared.token
    }

    pub fn get_circuit_breaker_state(&self) -> Option<CircuitState> {
        self.shared.breaker.as_ref().map(|b| b.state())
    }

    /// Spawn the fetch loops, the stall checker, and the lock renewal
    /// timer. Idempotent.
    pub fn run(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut tasks = self.tasks.lock();
        for _ in 0..self.shared.options.concurrency {
            let shared = self.shared.clone();
            tasks.spawn(async move { fetch_loop(shared).await });
        }
        let shared = self.shared.clone();
        tasks.spawn(async move { renewal_loop(shared).await });
        let shared = self.shared.clone();
        tasks.spawn(async move { stall_loop(shared).await });
    }

    /// Stop fetching, wait up to `drain_delay` for in-flight jobs, then
    /// force-terminate. Idempotent and prompt even while the circuit is
    /// open.
    pub async fn close(&self) {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown.cancel();
        if let Some(breaker) = &self.shared.breaker {
            breaker.close();
        }
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.shared.options.drain_delay, drain).await.is_err() {
            tracing::warn!(queue = %self.shared.queue, "drain delay elapsed, aborting in-flight jobs");
        }
        tracing::debug!(queue = %self.shared.queue, "worker closed");
    }
}

impl<C: Clock> Drop for Worker<C> {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
        self.tasks.lock().abort_all();
    }
}

// -- loops --

async fn fetch_loop<C: Clock>(shared: Arc<Shared<C>>) {
    loop {
        if shared.shutdown.is_cancelled() {
            return;
        }
        if let Some(breaker) = &shared.breaker {
            if !breaker.should_allow_job() {
                wait_or_shutdown(&shared, Duration::from_millis(250)).await;
                continue;
            }
        }

        let now = shared.clock.epoch_ms();
        let fetched = shared
            .engine
            .move_to_active(
                &shared.token,
                shared.options.lock_duration.as_millis() as u64,
                now,
                shared.options.limiter,
            )
            .await;

        match fetched {
            Ok(FetchResult::Job(job)) => {
                let mut current = Some(*job);
                while let Some(job) = current.take() {
                    current = process_one(&shared, job).await;
                }
            }
            Ok(FetchResult::RateLimited { ttl_ms }) => {
                emit_log(&shared, "rate-limited", None, None, None, None, Some(&Value::from(ttl_ms)));
                wait_for_marker(&shared, Duration::from_millis(ttl_ms)).await;
            }
            Ok(FetchResult::NextDelayed { fire_at }) => {
                let now = shared.clock.epoch_ms();
                let until = Duration::from_millis(fire_at.saturating_sub(now).max(10));
                wait_for_marker(&shared, until.min(shared.options.drain_delay)).await;
            }
            Ok(FetchResult::None) => {
                wait_for_marker(&shared, shared.options.drain_delay).await;
            }
            Err(err) => {
                tracing::warn!(queue = %shared.queue, error = %err, "fetch failed");
                wait_or_shutdown(&shared, Duration::from_millis(500)).await;
            }
        }
    }
}

async fn renewal_loop<C: Clock>(shared: Arc<Shared<C>>) {
    let every = shared.options.renew_every();
    loop {
        if wait_or_shutdown(&shared, every).await {
            return;
        }
        let jobs: Vec<(String, String)> = shared
            .active
            .lock()
            .keys()
            .map(|id| (id.clone(), shared.token.clone()))
            .collect();
        if jobs.is_empty() {
            continue;
        }
        match shared
            .engine
            .extend_locks(&jobs, shared.options.lock_duration.as_millis() as u64)
            .await
        {
            Ok(lost) => {
                for job_id in lost {
                    emit_log(&shared, "stalled", Some(&job_id), None, None, None, None);
                    if let Some(cancel) = shared.active.lock().get(&job_id) {
                        cancel.cancel();
                    }
                }
            }
            Err(err) => {
                tracing::warn!(queue = %shared.queue, error = %err, "lock renewal failed");
            }
        }
    }
}

async fn stall_loop<C: Clock>(shared: Arc<Shared<C>>) {
    let interval = shared.options.stalled_interval;
    loop {
        // jitter keeps a fleet of workers from thundering the throttle key
        let jitter = rand::thread_rng().gen_range(0..interval.as_millis().max(1) as u64 / 10 + 1);
        if wait_or_shutdown(&shared, interval + Duration::from_millis(jitter)).await {
            return;
        }
        let now = shared.clock.epoch_ms();
        let report = shared
            .engine
            .move_stalled_jobs_to_wait(
                shared.options.max_stalled_count,
                now,
                interval.as_millis() as u64,
                shared.options.stalled_scan_limit,
            )
            .await;
        match report {
            Ok(report) => {
                for job_id in &report.recovered {
                    emit_log(&shared, "stalled", Some(job_id), None, None, None, None);
                }
                for job_id in &report.failed {
                    emit_log(&shared, "failed", Some(job_id), None, None, None, None);
                }
                for (group_id, completed_keys) in &report.compensations {
                    if let Err(err) =
                        dispatch_compensations(&shared.engine, group_id, completed_keys, now).await
                    {
                        tracing::error!(
                            queue = %shared.queue,
                            group_id,
                            error = %err,
                            "compensation dispatch failed"
                        );
                    }
                }
            }
            Err(err) => {
                tracing::warn!(queue = %shared.queue, error = %err, "stall check failed");
            }
        }
    }
}

// -- processing --

/// Run one job to its finalization; returns the inline-fetched next job.
async fn process_one<C: Clock>(shared: &Arc<Shared<C>>, job: Job) -> Option<Job> {
    let cancel = CancellationToken::new();
    shared.active.lock().insert(job.id.clone(), cancel.clone());
    emit_log(shared, "active", Some(&job.id), Some(&job.name), Some(job.attempts_started), None, None);

    let context = JobContext {
        engine: shared.engine.clone(),
        job_id: job.id.clone(),
        token: shared.token.clone(),
        lock_duration_ms: shared.options.lock_duration.as_millis() as u64,
        keep_logs: job.opts.keep_logs,
    };
    let started = shared.clock.now();
    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        result = (shared.processor.as_ref())(job.clone(), context) => Some(result),
    };
    shared.active.lock().remove(&job.id);
    let duration_ms = shared.clock.now().duration_since(started).as_millis() as u64;

    let Some(result) = outcome else {
        // Lock lost mid-flight: the job is stalled; recovery owns it now.
        // Stalls never count against the circuit breaker.
        emit_log(shared, "stalled", Some(&job.id), Some(&job.name), None, Some(duration_ms), None);
        return None;
    };

    let next = match result {
        Ok(value) => finalize_success(shared, job, value, duration_ms).await,
        Err(err) => finalize_failure(shared, job, err, duration_ms).await,
    };
    match next {
        Ok(next) => next,
        Err(WorkerError::Closed) => None,
        Err(err) => {
            tracing::error!(queue = %shared.queue, error = %err, "finalize failed");
            None
        }
    }
}

fn keep_count(policy: &Option<RemovePolicy>, fallback: &Option<RemovePolicy>) -> (i64, u64) {
    let policy = policy.as_ref().or(fallback.as_ref());
    match policy {
        Some(policy) => (policy.keep_count(), policy.keep_age().unwrap_or(0)),
        None => (-1, 0),
    }
}

fn runtime_args<C: Clock>(shared: &Shared<C>) -> RuntimeArgs {
    RuntimeArgs {
        lock_duration_ms: shared.options.lock_duration.as_millis() as u64,
        metrics_max_points: shared.options.metrics_max_data_points,
        limiter: shared.options.limiter,
    }
}

async fn finalize_success<C: Clock>(
    shared: &Arc<Shared<C>>,
    job: Job,
    value: Value,
    duration_ms: u64,
) -> Result<Option<Job>, WorkerError> {
    let now = shared.clock.epoch_ms();
    let (keep, keep_age) =
        keep_count(&job.opts.remove_on_complete, &shared.options.remove_on_complete);
    let spec = FinishSpec {
        target: FinishTarget::Completed,
        result: serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string()),
        stacktrace: String::new(),
        keep_count: keep,
        keep_age,
        fetch_next: !shared.shutdown.is_cancelled() && shared.breaker.is_none(),
        dead_letter_queue: None,
    };
    let outcome = shared
        .engine
        .move_to_finished(&job, &shared.token, now, &spec, &runtime_args(shared))
        .await?;

    emit_log(shared, "completed", Some(&job.id), Some(&job.name), Some(job.attempts_made + 1), Some(duration_ms), None);
    if let Some(breaker) = &shared.breaker {
        breaker.record_success(&job.id);
    }
    settle_compensation_member(shared, &job, true, now).await;

    handle_finish_outcome(shared, outcome, now).await
}

async fn finalize_failure<C: Clock>(
    shared: &Arc<Shared<C>>,
    mut job: Job,
    err: ProcessError,
    duration_ms: u64,
) -> Result<Option<Job>, WorkerError> {
    let now = shared.clock.epoch_ms();
    job.record_failure(err.message(), err.message());
    let attempts_after = job.attempts_made + 1;
    let terminal = err.is_unrecoverable() || attempts_after >= job.opts.attempts;
    let stacktrace = serde_json::to_string(&job.stacktrace).unwrap_or_else(|_| "[]".to_string());

    if !terminal {
        let delay = retry_delay(shared, &mut job, &err, attempts_after);
        let fire_at = now.saturating_add(delay);
        let data_changed = job.data.get(grist_core::backoff::PREV_DELAY_FIELD).is_some();
        shared
            .engine
            .move_to_delayed(
                &job.id,
                &shared.token,
                fire_at,
                false,
                data_changed.then_some(&job.data),
                err.message(),
                &stacktrace,
            )
            .await?;
        emit_log(
            shared,
            "retrying",
            Some(&job.id),
            Some(&job.name),
            Some(attempts_after),
            Some(duration_ms),
            Some(&Value::from(delay)),
        );
        if let Some(breaker) = &shared.breaker {
            breaker.record_failure();
        }
        return Ok(None);
    }

    // terminal failure
    job.attempts_made = attempts_after;
    let dlq = shared.options.dead_letter_queue.as_ref().map(|d| d.queue_name.clone());
    if let Some(dlq_name) = &dlq {
        route_to_dlq(&shared.engine, dlq_name, &job, now).await?;
    }
    let (keep, keep_age) = if dlq.is_some() {
        // dead-lettered jobs leave no residue in the failed set
        (0, 0)
    } else {
        keep_count(&job.opts.remove_on_fail, &shared.options.remove_on_fail)
    };
    let spec = FinishSpec {
        target: FinishTarget::Failed,
        result: err.message().to_string(),
        stacktrace,
        keep_count: keep,
        keep_age,
        fetch_next: false,
        dead_letter_queue: dlq,
    };
    let outcome = shared
        .engine
        .move_to_finished(&job, &shared.token, now, &spec, &runtime_args(shared))
        .await?;

    emit_log(shared, "failed", Some(&job.id), Some(&job.name), Some(job.attempts_made), Some(duration_ms), None);
    if let Some(breaker) = &shared.breaker {
        breaker.record_failure();
    }
    settle_compensation_member(shared, &job, false, now).await;

    handle_finish_outcome(shared, outcome, now).await
}

/// Pick the backoff strategy (error-name override first) and compute the
/// delay; decorrelatedJitter mutates the job data in place.
fn retry_delay<C: Clock>(
    shared: &Shared<C>,
    job: &mut Job,
    err: &ProcessError,
    attempts_made: u32,
) -> u64 {
    let config = err
        .name()
        .and_then(|name| job.opts.error_backoffs.as_ref().and_then(|map| map.get(name)))
        .or(job.opts.backoff.as_ref());
    let Some(config) = config else {
        return 0;
    };
    let opts = config.normalize();
    let custom = match &opts {
        BackoffOpts::Custom { name, .. } => shared.options.backoff_strategies.get(name),
        _ => None,
    };
    match compute_backoff(&opts, attempts_made, err.name(), &mut job.data, custom) {
        Ok(delay) => delay,
        Err(err) => {
            tracing::warn!(queue = %shared.queue, error = %err, "backoff computation failed");
            0
        }
    }
}

async fn handle_finish_outcome<C: Clock>(
    shared: &Arc<Shared<C>>,
    outcome: FinishOutcome,
    now: u64,
) -> Result<Option<Job>, WorkerError> {
    match outcome {
        FinishOutcome::Done => Ok(None),
        FinishOutcome::Compensation { completed_keys } => {
            dispatch_for_keys(shared, &completed_keys, now).await;
            Ok(None)
        }
        FinishOutcome::Next(FetchResult::Job(job)) => Ok(Some(*job)),
        FinishOutcome::Next(_) => Ok(None),
    }
}

/// Resolve the group id from a member key and dispatch compensations.
async fn dispatch_for_keys<C: Clock>(shared: &Arc<Shared<C>>, completed_keys: &[String], now: u64) {
    let Some(first) = completed_keys.first() else {
        return;
    };
    let mut conn = shared.engine.connection();
    let group_id: Option<String> = redis::cmd("HGET")
        .arg(first)
        .arg("groupId")
        .query_async(&mut conn)
        .await
        .ok()
        .flatten();
    let Some(group_id) = group_id else {
        tracing::error!(queue = %shared.queue, key = %first, "completed member lost its group id");
        return;
    };
    if let Err(err) =
        dispatch_compensations(&shared.engine, &group_id, completed_keys, now).await
    {
        tracing::error!(
            queue = %shared.queue,
            group_id = %group_id,
            error = %err,
            "compensation dispatch failed"
        );
    }
}

/// When the finished job is a compensation member, settle its outcome
/// against the source group.
async fn settle_compensation_member<C: Clock>(
    shared: &Arc<Shared<C>>,
    job: &Job,
    succeeded: bool,
    now: u64,
) {
    if job.data.get(COMPENSATION_FIELD).and_then(Value::as_bool) != Some(true) {
        return;
    }
    let (Some(group_id), Some(source_queue)) = (
        job.data.get("groupId").and_then(Value::as_str),
        job.data.get("sourceQueue").and_then(Value::as_str),
    ) else {
        tracing::error!(queue = %shared.queue, job_id = %job.id, "compensation job missing provenance");
        return;
    };
    let source = shared.engine.keys().sibling(source_queue);
    match shared
        .engine
        .update_group_compensation(&source, group_id, succeeded, now)
        .await
    {
        Ok(state) => {
            tracing::debug!(
                queue = %shared.queue,
                group_id,
                state = %state,
                "compensation outcome recorded"
            );
        }
        Err(err) => {
            tracing::warn!(
                queue = %shared.queue,
                group_id,
                error = %err,
                "compensation outcome rejected"
            );
        }
    }
}

// -- plumbing --

/// Sleep that returns `true` when shutdown fired.
async fn wait_or_shutdown<C: Clock>(shared: &Arc<Shared<C>>, duration: Duration) -> bool {
    tokio::select! {
        _ = shared.shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Block on the wake marker for up to `timeout`.
async fn wait_for_marker<C: Clock>(shared: &Arc<Shared<C>>, timeout: Duration) {
    let marker = shared.engine.keys().marker();
    let secs = timeout.as_secs_f64().max(0.05);
    let pop = async {
        let mut conn = shared.blocking.lock().await;
        let _: Result<Option<(String, String, f64)>, _> = redis::cmd("BZPOPMIN")
            .arg(&marker)
            .arg(secs)
            .query_async(&mut *conn)
            .await;
    };
    tokio::select! {
        _ = shared.shutdown.cancelled() => {}
        _ = pop => {}
    }
}

/// Append a worker-side event to the queue's events stream.
async fn emit_stream_event(engine: StateEngine, event: Event) {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(engine.keys().events()).arg("MAXLEN").arg("~").arg(10_000).arg("*");
    for (key, value) in event.to_fields() {
        cmd.arg(key).arg(value);
    }
    let mut conn = engine.connection();
    if let Err(err) = cmd.query_async::<String>(&mut conn).await {
        tracing::warn!(error = %err, "failed to emit stream event");
    }
}

/// Lifecycle logging: one truthy check when no logger is configured.
#[allow(clippy::too_many_arguments)]
fn emit_log<C: Clock>(
    shared: &Shared<C>,
    event: &str,
    job_id: Option<&str>,
    job_name: Option<&str>,
    attempts_made: Option<u32>,
    duration_ms: Option<u64>,
    data: Option<&Value>,
) {
    let Some(logger) = &shared.options.logger else {
        return;
    };
    if let Some(allowlist) = &shared.options.log_events {
        if !allowlist.contains(event) {
            return;
        }
    }
    logger.log(
        level_for(event),
        &LifecycleEntry {
            timestamp: shared.clock.epoch_ms(),
            event,
            queue: &shared.queue,
            job_id,
            job_name,
            attempts_made,
            duration_ms,
            data,
        },
    );
}
