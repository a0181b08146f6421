//! Background asset loading. Results come back to the event loop as user
//! events, so all scene state stays on the UI thread.

use crate::assets::{self, AssetError, Decorations, LoadedScene};
use crate::config::{AssetPaths, ModelPlacement, PresentationConfig};
use std::thread;
use winit::event_loop::EventLoopProxy;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    Loading,
    Ready,
    /// Carries the message shown under the loader.
    Failed(String),
}

#[derive(Debug)]
pub enum AppEvent {
    DecorationsLoaded(Decorations),
    SceneLoaded(Result<LoadedScene, AssetError>),
}

pub struct LoadRequest {
    pub assets: AssetPaths,
    pub placement: ModelPlacement,
    pub presentation: PresentationConfig,
}

/// Decorations first (small, never fatal), then the environment and model.
pub fn spawn(proxy: EventLoopProxy<AppEvent>, request: LoadRequest) -> std::io::Result<()> {
    thread::Builder::new()
        .name("asset-loader".to_string())
        .spawn(move || {
            let decorations = assets::load_decorations(&request.assets, &request.presentation);
            if proxy
                .send_event(AppEvent::DecorationsLoaded(decorations))
                .is_err()
            {
                return;
            }
            let scene = assets::load_scene(&request.assets, &request.placement);
            if proxy.send_event(AppEvent::SceneLoaded(scene)).is_err() {
                log::debug!("Event loop closed before the scene finished loading");
            }
        })
        .map(|_| ())
}
