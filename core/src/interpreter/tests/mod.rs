//! Tests for the interpreter driver
//!
//! Organized by feature area. Each test runs a whole program through
//! `execute_code` and inspects the returned trace.

mod helpers;

mod builtin_tests;
mod control_flow_tests;
mod error_tests;
mod event_loop_tests;
mod function_tests;
