// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn versioned_names_carry_the_package_version() {
    let name = versioned_name("moveToActive");
    assert!(name.starts_with("grist:moveToActive:"));
    assert!(name.ends_with(VERSION));
}

#[test]
fn catalog_assembles_distinct_scripts() {
    let catalog = ScriptCatalog::new();
    // Content hashes differ when bodies differ.
    assert_ne!(catalog.add_job.get_hash(), catalog.move_to_active.get_hash());
    assert_ne!(catalog.move_to_finished.get_hash(), catalog.move_to_active.get_hash());
    assert_ne!(catalog.pause.get_hash(), catalog.drain.get_hash());
}

#[test]
fn catalog_is_deterministic() {
    let a = ScriptCatalog::new();
    let b = ScriptCatalog::new();
    assert_eq!(a.move_to_finished.get_hash(), b.move_to_finished.get_hash());
    assert_eq!(a.add_job.get_hash(), b.add_job.get_hash());
}
