// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reversible encoding of option bags and script argument packs.
//!
//! MessagePack with named fields: scripts unpack the blob with `cmsgpack`
//! and read fields by name, so the wire shape is stable across versions.
//! Absent optionals encode as explicit nil; dates are epoch-ms integers.

use crate::error::CoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value into the compact blob handed to state scripts.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Inverse of [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
