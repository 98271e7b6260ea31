// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job insertion.

use crate::engine::StateEngine;
use crate::ScriptError;
use grist_core::codec;
use grist_core::opts::JobOpts;
use redis::ScriptInvocation;
use serde_json::Value;

/// One job to insert.
#[derive(Debug, Clone)]
pub struct AddJobArgs {
    pub name: String,
    pub data: Value,
    pub opts: JobOpts,
    /// Set by the flow producer for parent nodes whose children are inserted
    /// in the same batch; parks the job in waiting-children.
    pub has_pending_children: bool,
}

impl AddJobArgs {
    pub fn new(name: impl Into<String>, data: Value, opts: JobOpts) -> Self {
        Self { name: name.into(), data, opts, has_pending_children: false }
    }
}

/// Apply the add_job KEYS/ARGV layout onto a prepared invocation.
pub(crate) fn apply_add_job(
    invocation: &mut ScriptInvocation<'_>,
    engine: &StateEngine,
    args: &AddJobArgs,
    timestamp: u64,
) -> Result<(), ScriptError> {
    let keys = engine.keys();
    let opts = &args.opts;

    let dedup_key = match &opts.deduplication_id {
        Some(id) => keys.dedup(id),
        None => keys.meta(),
    };
    let parent_key = opts
        .parent
        .as_ref()
        .map(|parent| keys.sibling(&parent.queue).job(&parent.id));
    let parent_deps_key = parent_key
        .as_ref()
        .map(|key| format!("{key}:dependencies"))
        .unwrap_or_else(|| keys.meta());
    let group_jobs_key = match &opts.group {
        Some(group) => keys.group_jobs(&group.id),
        None => keys.meta(),
    };

    invocation
        .key(keys.wait())
        .key(keys.paused())
        .key(keys.meta())
        .key(keys.id_counter())
        .key(keys.delayed())
        .key(keys.prioritized())
        .key(keys.waiting_children())
        .key(keys.events())
        .key(keys.priority_counter())
        .key(keys.marker())
        .key(dedup_key)
        .key(parent_deps_key)
        .key(group_jobs_key)
        .arg(engine.base_arg())
        .arg(opts.job_id.as_deref().unwrap_or(""))
        .arg(&args.name)
        .arg(timestamp)
        .arg(serde_json::to_string(&args.data)?)
        .arg(codec::encode(opts)?)
        .arg(opts.delay)
        .arg(opts.priority)
        .arg(if opts.lifo { "1" } else { "0" })
        .arg(opts.deduplication_id.as_deref().unwrap_or(""))
        .arg(parent_key.unwrap_or_default())
        .arg(opts.group.as_ref().map(|g| g.id.as_str()).unwrap_or(""))
        .arg(if args.has_pending_children { "1" } else { "0" });
    Ok(())
}

impl StateEngine {
    /// A pipeline-ready add_job invocation, for callers composing their own
    /// atomic batches (flows, groups).
    pub fn prepare_add_job(
        &self,
        args: &AddJobArgs,
        timestamp: u64,
    ) -> Result<redis::ScriptInvocation<'_>, ScriptError> {
        args.opts.validate()?;
        let mut invocation = self.catalog().add_job.prepare_invoke();
        apply_add_job(&mut invocation, self, args, timestamp)?;
        Ok(invocation)
    }

    /// Load the add_job script so EVALSHA inside MULTI cannot miss.
    pub async fn ensure_add_job_loaded(&self) -> Result<(), ScriptError> {
        let mut conn = self.connection();
        self.catalog().add_job.prepare_invoke().load_async(&mut conn).await?;
        Ok(())
    }

    /// Insert one job; returns its id (the existing id on a dedup hit).
    pub async fn add_job(&self, args: &AddJobArgs, timestamp: u64) -> Result<String, ScriptError> {
        args.opts.validate()?;
        let mut conn = self.connection();
        let mut invocation = self.catalog().add_job.prepare_invoke();
        apply_add_job(&mut invocation, self, args, timestamp)?;
        Ok(invocation.invoke_async(&mut conn).await?)
    }

    /// Insert a batch of jobs in one atomic transaction.
    pub async fn add_bulk(
        &self,
        jobs: &[AddJobArgs],
        timestamp: u64,
    ) -> Result<Vec<String>, ScriptError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        for job in jobs {
            job.opts.validate()?;
        }
        let mut conn = self.connection();
        // EVALSHA inside MULTI cannot recover from NOSCRIPT; load up front.
        self.catalog().add_job.prepare_invoke().load_async(&mut conn).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        let mut invocations = Vec::with_capacity(jobs.len());
        for job in jobs {
            let mut invocation = self.catalog().add_job.prepare_invoke();
            apply_add_job(&mut invocation, self, job, timestamp)?;
            invocations.push(invocation);
        }
        for invocation in &invocations {
            pipe.invoke_script(invocation);
        }
        Ok(pipe.query_async(&mut conn).await?)
    }
}
