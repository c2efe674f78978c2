mod app;

use std::path::PathBuf;

use crate::app::App;
use anyhow::{Context, Result};
use deskscape_runtime::{DEFAULT_CONFIG_FILE, RuntimeEvent, SceneConfig};
use winit::event_loop::EventLoop;

fn run() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = SceneConfig::load_or_default(&config_path)?;

    let event_loop = EventLoop::<RuntimeEvent>::with_user_event()
        .build()
        .context("create event loop")?;
    let mut app = App::new(&event_loop, config);
    event_loop.run_app(&mut app).context("event loop")?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
