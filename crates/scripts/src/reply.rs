// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding helpers for script replies.

use crate::ScriptError;
use grist_core::job::Job;
use redis::Value;
use std::collections::HashMap;

/// A string out of a reply element.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An integer out of a reply element.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).parse().ok(),
        _ => None,
    }
}

/// The elements of an array reply.
pub fn as_array(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// A list of strings out of an array reply.
pub fn string_list(value: &Value, command: &'static str) -> Result<Vec<String>, ScriptError> {
    as_array(value)
        .map(|items| items.iter().filter_map(as_string).collect())
        .ok_or_else(|| unexpected(command, value))
}

/// A flat `{k, v, ...}` hash reply into field bytes.
pub fn hash_fields(value: &Value) -> Option<HashMap<String, Vec<u8>>> {
    let items = as_array(value)?;
    let mut fields = HashMap::with_capacity(items.len() / 2);
    for pair in items.chunks_exact(2) {
        let key = as_string(&pair[0])?;
        let raw = match &pair[1] {
            Value::BulkString(bytes) => bytes.clone(),
            Value::SimpleString(s) => s.clone().into_bytes(),
            Value::Int(n) => n.to_string().into_bytes(),
            _ => return None,
        };
        fields.insert(key, raw);
    }
    Some(fields)
}

/// Parse a `{1, jobId, {k, v, ...}}` acquisition reply tail into a job view.
pub fn job_from_reply(
    queue: &str,
    items: &[Value],
    command: &'static str,
) -> Result<Job, ScriptError> {
    let job_id = items
        .get(1)
        .and_then(as_string)
        .ok_or_else(|| unexpected_slice(command, items))?;
    let fields = items
        .get(2)
        .and_then(hash_fields)
        .ok_or_else(|| unexpected_slice(command, items))?;
    Ok(Job::from_hash(queue, &job_id, fields)?)
}

pub fn unexpected(command: &'static str, value: &Value) -> ScriptError {
    ScriptError::UnexpectedReply { command, detail: format!("{value:?}") }
}

fn unexpected_slice(command: &'static str, items: &[Value]) -> ScriptError {
    ScriptError::UnexpectedReply { command, detail: format!("{items:?}") }
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
