//! Tracing subscriber setup

use tracing_subscriber::prelude::*;

#[cfg(debug_assertions)]
const DEFAULT_FILTER: &str = "debug,eframe=warn,egui=warn,wgpu_hal=warn,wgpu_core=warn";
#[cfg(not(debug_assertions))]
const DEFAULT_FILTER: &str = "info,eframe=warn,wgpu_hal=warn";

/// Install the global fmt subscriber, filtered by `RUST_LOG`
pub fn setup_logging() {
    let defaulted = std::env::var("RUST_LOG").is_err();
    if defaulted {
        // Safety: single-threaded at startup
        unsafe {
            std::env::set_var("RUST_LOG", DEFAULT_FILTER);
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    if defaulted {
        tracing::debug!("RUST_LOG set to default: {}", DEFAULT_FILTER);
    }
}
