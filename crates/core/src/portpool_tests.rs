// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn acquire_returns_highest_port_first() {
    let pool = PortPool::new(9000, 9002);
    assert_eq!(pool.acquire(), Ok(9002));
    assert_eq!(pool.acquire(), Ok(9001));
    assert_eq!(pool.acquire(), Ok(9000));
}

#[test]
fn acquire_fails_when_exhausted() {
    let pool = PortPool::new(9000, 9000);
    assert_eq!(pool.acquire(), Ok(9000));
    assert_eq!(pool.acquire(), Err(PortPoolError::Exhausted));
}

#[test]
fn released_port_becomes_available_again() {
    let pool = PortPool::new(9000, 9000);
    let port = pool.acquire().unwrap();
    pool.release(port).unwrap();
    assert_eq!(pool.acquire(), Ok(9000));
}

#[test]
fn double_release_is_refused() {
    let pool = PortPool::new(9000, 9001);
    let port = pool.acquire().unwrap();
    pool.release(port).unwrap();
    assert_eq!(pool.release(port), Err(PortPoolError::NotOnLoan(port)));
}

#[test]
fn release_of_port_never_acquired_is_refused() {
    let pool = PortPool::new(9000, 9001);
    assert_eq!(pool.release(9000), Err(PortPoolError::NotOnLoan(9000)));
}

#[test]
fn from_range_str_parses_closed_interval() {
    let pool = PortPool::from_range_str("9000-9002").unwrap();
    assert_eq!(pool.available(), 3);
}

#[test]
fn from_range_str_rejects_malformed_or_inverted_ranges() {
    assert!(PortPool::from_range_str("not-a-range").is_none());
    assert!(PortPool::from_range_str("9002-9000").is_none());
}

#[test]
fn available_and_outstanding_track_loans() {
    let pool = PortPool::new(9000, 9001);
    assert_eq!(pool.available(), 2);
    assert_eq!(pool.outstanding(), 0);

    let port = pool.acquire().unwrap();
    assert_eq!(pool.available(), 1);
    assert_eq!(pool.outstanding(), 1);

    pool.release(port).unwrap();
    assert_eq!(pool.available(), 2);
    assert_eq!(pool.outstanding(), 0);
}
