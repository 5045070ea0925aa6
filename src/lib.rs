#![doc(test(attr(deny(warnings))))]

//! Headless multi-step form wizards: step navigation gated by schema
//! validation, debounced draft autosave, bounded numeric and date inputs and
//! an async submission lifecycle, plus a small terminal front end.

pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod features;
pub mod input;
pub mod query;
pub mod storage;
pub mod utils;
pub mod wizard;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("gofast_wish tracing initialized.");
    });
}
