//! saavy-modular - polyphonic patch demo with a terminal view of the voice pool
//!
//! Run with: cargo run --bin saavy-modular
//! Logs go to saavy-modular.log (RUST_LOG overrides the default `info`).

mod app;
mod score;
mod ui;

use std::fs::File;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use saavy_modular::EngineConfig;

use app::Modular;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_logging()?;

    let config = EngineConfig::default().with_voice_count(6);
    Modular::new(config, score::demo()).run()
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging() -> EyreResult<()> {
    let file = File::create("saavy-modular.log").wrap_err("failed to create log file")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
