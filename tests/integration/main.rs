//! End-to-end tests across the auth, cache and sync crates.

mod helpers;

mod access_test;
mod guard_test;
mod invalidation_test;
mod reconnect_test;
