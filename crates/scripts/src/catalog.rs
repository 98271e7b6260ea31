// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Lua script catalog.
//!
//! Sources live under `lua/`; shared helpers under `lua/includes/` are
//! prepended at assembly time so each script ships to the server as one
//! self-contained chunk. Scripts are addressed by content hash (EVALSHA),
//! so processes running different package versions never collide; the
//! versioned name is carried for logging and debugging only.

use redis::Script;

/// Package version baked into script names.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const PRELUDE: &str = include_str!("../lua/includes/prelude.lua");
const PUSH_READY: &str = include_str!("../lua/includes/push_ready.lua");
const PROMOTE_DELAYED: &str = include_str!("../lua/includes/promote_delayed.lua");
const TAKE_NEXT_JOB: &str = include_str!("../lua/includes/take_next_job.lua");
const GROUP_UPDATE: &str = include_str!("../lua/includes/group_update.lua");
const PARENT_RESOLVE: &str = include_str!("../lua/includes/parent_resolve.lua");
const RETENTION: &str = include_str!("../lua/includes/retention.lua");

/// Versioned script name, e.g. `grist:moveToActive:0.2.0`.
pub fn versioned_name(base: &str) -> String {
    format!("grist:{base}:{VERSION}")
}

fn assemble(includes: &[&str], body: &str) -> Script {
    let mut source = String::from(PRELUDE);
    for include in includes {
        source.push('\n');
        source.push_str(include);
    }
    source.push('\n');
    source.push_str(body);
    Script::new(&source)
}

/// One assembled [`Script`] per state transition.
#[derive(Clone)]
pub struct ScriptCatalog {
    pub add_job: Script,
    pub add_group: Script,
    pub move_to_active: Script,
    pub move_to_finished: Script,
    pub move_to_delayed: Script,
    pub move_to_waiting_children: Script,
    pub remove_child_dependency: Script,
    pub extend_lock: Script,
    pub extend_locks: Script,
    pub move_stalled_jobs_to_wait: Script,
    pub retry_job: Script,
    pub retry_jobs: Script,
    pub promote: Script,
    pub promote_jobs: Script,
    pub change_delay: Script,
    pub change_priority: Script,
    pub pause: Script,
    pub drain: Script,
    pub obliterate: Script,
    pub clean_jobs_in_set: Script,
    pub remove_job: Script,
    pub update_progress: Script,
    pub add_log: Script,
    pub is_job_in_list: Script,
    pub cancel_group_jobs: Script,
    pub update_group_compensation: Script,
}

impl Default for ScriptCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptCatalog {
    pub fn new() -> Self {
        Self {
            add_job: assemble(&[PUSH_READY], include_str!("../lua/add_job.lua")),
            add_group: assemble(&[], include_str!("../lua/add_group.lua")),
            move_to_active: assemble(
                &[PUSH_READY, PROMOTE_DELAYED, TAKE_NEXT_JOB],
                include_str!("../lua/move_to_active.lua"),
            ),
            move_to_finished: assemble(
                &[
                    PUSH_READY,
                    PROMOTE_DELAYED,
                    TAKE_NEXT_JOB,
                    GROUP_UPDATE,
                    PARENT_RESOLVE,
                    RETENTION,
                ],
                include_str!("../lua/move_to_finished.lua"),
            ),
            move_to_delayed: assemble(&[], include_str!("../lua/move_to_delayed.lua")),
            move_to_waiting_children: assemble(
                &[],
                include_str!("../lua/move_to_waiting_children.lua"),
            ),
            remove_child_dependency: assemble(
                &[PUSH_READY, PARENT_RESOLVE],
                include_str!("../lua/remove_child_dependency.lua"),
            ),
            extend_lock: assemble(&[], include_str!("../lua/extend_lock.lua")),
            extend_locks: assemble(&[], include_str!("../lua/extend_locks.lua")),
            move_stalled_jobs_to_wait: assemble(
                &[PUSH_READY, GROUP_UPDATE],
                include_str!("../lua/move_stalled_jobs_to_wait.lua"),
            ),
            retry_job: assemble(&[PUSH_READY], include_str!("../lua/retry_job.lua")),
            retry_jobs: assemble(&[PUSH_READY], include_str!("../lua/retry_jobs.lua")),
            promote: assemble(&[PUSH_READY], include_str!("../lua/promote.lua")),
            promote_jobs: assemble(&[PUSH_READY], include_str!("../lua/promote_jobs.lua")),
            change_delay: assemble(&[], include_str!("../lua/change_delay.lua")),
            change_priority: assemble(&[], include_str!("../lua/change_priority.lua")),
            pause: assemble(&[], include_str!("../lua/pause.lua")),
            drain: assemble(&[], include_str!("../lua/drain.lua")),
            obliterate: assemble(&[], include_str!("../lua/obliterate.lua")),
            clean_jobs_in_set: assemble(&[], include_str!("../lua/clean_jobs_in_set.lua")),
            remove_job: assemble(
                &[PUSH_READY, PARENT_RESOLVE],
                include_str!("../lua/remove_job.lua"),
            ),
            update_progress: assemble(&[], include_str!("../lua/update_progress.lua")),
            add_log: assemble(&[], include_str!("../lua/add_log.lua")),
            is_job_in_list: assemble(&[], include_str!("../lua/is_job_in_list.lua")),
            cancel_group_jobs: assemble(
                &[GROUP_UPDATE],
                include_str!("../lua/cancel_group_jobs.lua"),
            ),
            update_group_compensation: assemble(
                &[],
                include_str!("../lua/update_group_compensation.lua"),
            ),
        }
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
