// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_ms_is_nonzero() {
    let clock = SystemClock;
    assert!(clock.epoch_ms() > 0);
}

#[test]
fn fake_clock_starts_at_the_pinned_epoch() {
    assert_eq!(FakeClock::new().epoch_ms(), FAKE_EPOCH_MS);
    assert_eq!(FakeClock::at(42).epoch_ms(), 42);
}

#[test]
fn fake_clock_advances_both_axes_together() {
    let clock = FakeClock::at(1_000);
    let start = clock.now();
    clock.advance(Duration::from_millis(2_500));
    assert_eq!(clock.epoch_ms(), 3_500);
    assert_eq!(clock.now() - start, Duration::from_millis(2_500));

    clock.advance_ms(500);
    assert_eq!(clock.epoch_ms(), 4_000);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::at(100);
    let other = clock.clone();
    clock.advance_ms(50);
    assert_eq!(other.epoch_ms(), 150);
}

#[test]
fn fire_at_offsets_from_the_current_epoch() {
    let clock = FakeClock::at(10_000);
    assert_eq!(clock.fire_at(250), 10_250);
    clock.advance_ms(1_000);
    assert_eq!(clock.fire_at(250), 11_250);
}

#[test]
fn cutoff_saturates_at_the_epoch_origin() {
    let clock = FakeClock::at(5_000);
    assert_eq!(clock.cutoff(2_000), 3_000);
    // a grace period longer than recorded history clamps to zero
    assert_eq!(clock.cutoff(60_000), 0);
}
