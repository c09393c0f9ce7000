/*
 * This module provides the application logic layer, centered around
 * `RestockApp`, which owns the list store and drives the share and import
 * workflows on behalf of a front end. Background share rendering lives in
 * `render_job`. Unit tests for `RestockApp` are in `handler_tests.rs`.
 */
pub mod handler;
pub mod render_job;
pub mod ui_constants;


pub use handler::{RestockApp, ShareState};
