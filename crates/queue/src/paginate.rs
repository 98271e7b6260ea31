// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pagination over hashes, sets, and sorted sets.
//!
//! SCAN-family cursors do not map onto offsets, so each call runs at most
//! five iterations and hands the cursor back; callers resume from it.

use crate::queue::Queue;
use crate::QueueError;
use grist_core::clock::Clock;
use grist_core::job::Job;

/// Most SCAN iterations a single paginate call may issue.
const MAX_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PaginateOpts {
    /// Cursor from a previous page; 0 starts over.
    pub cursor: u64,
    /// Max items returned in this page.
    pub page_size: usize,
    /// Also fetch the job hash behind each member id.
    pub fetch_jobs: bool,
}

/// One page of members.
#[derive(Debug, Default)]
pub struct Page {
    /// Resume cursor; 0 means the iteration completed.
    pub cursor: u64,
    /// `(member, value)` pairs; hash values and zset scores, `None` for sets.
    pub items: Vec<(String, Option<String>)>,
    /// Job views, when `fetch_jobs` was requested.
    pub jobs: Vec<Job>,
}

impl<C: Clock> Queue<C> {
    /// Browse a raw key with bounded iterations per call.
    pub async fn paginate(&self, key: &str, opts: PaginateOpts) -> Result<Page, QueueError> {
        let mut conn = self.engine().connection();
        let kind: String = redis::cmd("TYPE").arg(key).query_async(&mut conn).await?;
        let page_size = opts.page_size.max(1);

        let mut page = Page { cursor: opts.cursor, ..Page::default() };

        if kind == "list" {
            let start = opts.cursor as isize;
            let end = start + page_size as isize - 1;
            let members: Vec<String> =
                redis::cmd("LRANGE").arg(key).arg(start).arg(end).query_async(&mut conn).await?;
            let fetched = members.len();
            page.items = members.into_iter().map(|m| (m, None)).collect();
            page.cursor = if fetched < page_size { 0 } else { opts.cursor + fetched as u64 };
        } else {
            let scan_cmd = match kind.as_str() {
                "hash" => "HSCAN",
                "zset" => "ZSCAN",
                "set" => "SSCAN",
                _ => return Ok(page),
            };
            let paired = kind != "set";
            for _ in 0..MAX_ITERATIONS {
                let (next, batch): (u64, Vec<String>) = redis::cmd(scan_cmd)
                    .arg(key)
                    .arg(page.cursor)
                    .arg("COUNT")
                    .arg(page_size)
                    .query_async(&mut conn)
                    .await?;
                if paired {
                    for pair in batch.chunks_exact(2) {
                        page.items.push((pair[0].clone(), Some(pair[1].clone())));
                    }
                } else {
                    page.items.extend(batch.into_iter().map(|m| (m, None)));
                }
                page.cursor = next;
                if next == 0 || page.items.len() >= page_size {
                    break;
                }
            }
        }

        if opts.fetch_jobs {
            for (member, _) in &page.items {
                let job_id = member.rsplit(':').next().unwrap_or(member);
                if let Some(job) = self.get_job(job_id).await? {
                    page.jobs.push(job);
                }
            }
        }
        Ok(page)
    }
}
