//! archviz - building model viewer
//!
//! Opens one window showing a glTF building lit by a hemisphere and a
//! shadow-casting directional light, with an HDR environment for reflections
//! and orbit camera controls. Hovering the model shows a tooltip.
//!
//! Usage: `archviz [config.json]`. Without an argument `archviz.json` in the
//! working directory is used when present, built-in defaults otherwise.

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

use config::ViewerConfig;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match ViewerConfig::resolve(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    log::info!("archviz {}", env!("CARGO_PKG_VERSION"));
    log::info!("   Drag to orbit, right-drag to pan, scroll to zoom, ESC to exit");

    if let Err(err) = app::run(config) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
