//! Test suites for the gateway runtime.

mod support;
mod unit;
