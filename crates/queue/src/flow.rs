// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow producer: parent/child trees and saga groups, inserted atomically.

use crate::QueueError;
use grist_conn::{connect, probe_server, ConnOptions};
use grist_core::clock::{Clock, SystemClock};
use grist_core::group::{validate_group_jobs, CompensationSpec};
use grist_core::keys::{KeySpace, DEFAULT_PREFIX};
use grist_core::opts::{GroupRef, JobOpts, ParentRef};
use grist_scripts::{AddJobArgs, StateEngine};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One node of a flow tree.
#[derive(Debug, Clone)]
pub struct FlowJob {
    pub name: String,
    pub queue_name: String,
    pub data: Value,
    pub opts: JobOpts,
    pub children: Vec<FlowJob>,
}

impl FlowJob {
    pub fn new(name: impl Into<String>, queue_name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            queue_name: queue_name.into(),
            data,
            opts: JobOpts::default(),
            children: Vec::new(),
        }
    }

    grist_core::setters! {
        set {
            opts: JobOpts,
            children: Vec<FlowJob>,
        }
    }
}

/// Ids assigned to a flow tree, mirroring its shape.
#[derive(Debug, Clone)]
pub struct FlowNodeIds {
    pub job_id: String,
    pub queue_name: String,
    pub children: Vec<FlowNodeIds>,
}

/// A saga group: independent jobs with optional per-member compensation.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub name: String,
    pub queue_name: String,
    /// `(name, data, opts)` per member.
    pub jobs: Vec<(String, Value, JobOpts)>,
    pub compensation: Option<HashMap<String, CompensationSpec>>,
}

/// Composes trees of dependent jobs and saga groups.
pub struct FlowProducer<C: Clock = SystemClock> {
    anchor: StateEngine,
    clock: C,
}

impl FlowProducer<SystemClock> {
    /// Connect with the system clock.
    pub async fn connect(
        prefix: Option<String>,
        clustered: bool,
        conn: ConnOptions,
    ) -> Result<Self, QueueError> {
        Self::connect_with_clock(prefix, clustered, conn, SystemClock).await
    }
}

impl<C: Clock> FlowProducer<C> {
    pub async fn connect_with_clock(
        prefix: Option<String>,
        clustered: bool,
        conn: ConnOptions,
        clock: C,
    ) -> Result<Self, QueueError> {
        let prefix = prefix
            .or_else(grist_conn::env::test_prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let mut manager = connect(&conn).await?;
        let version = probe_server(&mut manager).await?;
        // The anchor keyspace is never touched; every node names its queue.
        let keys = if clustered {
            KeySpace::clustered(prefix, "_flow")
        } else {
            KeySpace::new(prefix, "_flow")
        };
        let anchor = StateEngine::new(manager, keys, version.supports_lpos());
        Ok(Self { anchor, clock })
    }

    /// Build over an existing engine (shares its connection and catalog).
    pub fn with_engine(engine: StateEngine, clock: C) -> Self {
        Self { anchor: engine, clock }
    }

    fn engine_for(&self, queue: &str) -> StateEngine {
        self.anchor.sibling(queue)
    }

    /// Insert a parent/child tree in one atomic transaction.
    ///
    /// Parents park in waiting-children until every child settles; children
    /// carry the child-to-parent edge. Ids are pre-assigned so the whole
    /// tree can go in one batch.
    pub async fn add_flow(&self, root: FlowJob) -> Result<FlowNodeIds, QueueError> {
        let mut nodes = Vec::new();
        let ids = flatten(root, None, &mut nodes);

        let engines: Vec<StateEngine> =
            nodes.iter().map(|(queue, _)| self.engine_for(queue)).collect();
        if let Some(first) = engines.first() {
            first.ensure_add_job_loaded().await?;
        }
        let mut invocations = Vec::with_capacity(nodes.len());
        let timestamp = self.clock.epoch_ms();
        for ((_, args), engine) in nodes.iter().zip(&engines) {
            invocations.push(engine.prepare_add_job(args, timestamp)?);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for invocation in &invocations {
            pipe.invoke_script(invocation);
        }
        let mut conn = self.anchor.connection();
        let _: Vec<redis::Value> = pipe.query_async(&mut conn).await?;

        tracing::debug!(root_id = %ids.job_id, nodes = nodes.len(), "added flow");
        Ok(ids)
    }

    /// Create a saga group: validates the §group preconditions, stamps each
    /// member with the group ref, and inserts group + members atomically.
    /// Returns `(groupId, member job ids)`.
    pub async fn add_group(&self, spec: GroupSpec) -> Result<(String, Vec<String>), QueueError> {
        let names: Vec<String> = spec.jobs.iter().map(|(name, _, _)| name.clone()).collect();
        let has_parent: Vec<bool> =
            spec.jobs.iter().map(|(_, _, opts)| opts.parent.is_some()).collect();
        validate_group_jobs(&names, &has_parent, spec.compensation.as_ref())?;

        let group_id = Uuid::new_v4().to_string();
        let group_ref = GroupRef {
            id: group_id.clone(),
            name: spec.name.clone(),
            queue: spec.queue_name.clone(),
        };

        let members: Vec<AddJobArgs> = spec
            .jobs
            .into_iter()
            .map(|(name, data, mut opts)| {
                if opts.job_id.is_none() {
                    opts.job_id = Some(Uuid::new_v4().to_string());
                }
                opts.group = Some(group_ref.clone());
                AddJobArgs::new(name, data, opts)
            })
            .collect();

        let engine = self.engine_for(&spec.queue_name);
        let member_ids = engine
            .add_group(
                &group_id,
                &spec.name,
                self.clock.epoch_ms(),
                &members,
                spec.compensation.as_ref(),
            )
            .await?;

        tracing::info!(
            queue = %spec.queue_name,
            group_id = %group_id,
            members = member_ids.len(),
            "added group"
        );
        Ok((group_id, member_ids))
    }
}

/// Depth-first flatten; assigns ids and parent refs, returns the id tree.
fn flatten(
    mut node: FlowJob,
    parent: Option<(&str, &str)>,
    out: &mut Vec<(String, AddJobArgs)>,
) -> FlowNodeIds {
    if node.opts.job_id.is_none() {
        node.opts.job_id = Some(Uuid::new_v4().to_string());
    }
    let job_id = node.opts.job_id.clone().unwrap_or_default();
    if let Some((parent_id, parent_queue)) = parent {
        node.opts.parent =
            Some(ParentRef { id: parent_id.to_string(), queue: parent_queue.to_string() });
    }

    let mut args = AddJobArgs::new(node.name, node.data, node.opts);
    args.has_pending_children = !node.children.is_empty();
    let queue_name = node.queue_name.clone();
    out.push((queue_name.clone(), args));

    let children = node
        .children
        .into_iter()
        .map(|child| flatten(child, Some((&job_id, &queue_name)), out))
        .collect();

    FlowNodeIds { job_id, queue_name, children }
}
