//! Headless demo: flies the player around the demo scene for a few seconds of
//! simulated time against the recording renderer, then logs a summary.
//!
//! Usage: `rotorcs [config.json]`. Set `RUST_LOG=rotorcs=debug` for more detail.

use tracing_subscriber::EnvFilter;

use rotorcs::config::{ConfigError, EngineConfig};
use rotorcs::engine::{Engine, FixedClock};
use rotorcs::input::{InputEvent, KeyCode, ScriptedInput};
use rotorcs::renderer::RecordingRenderer;
use rotorcs::scene::DemoScene;

const DEMO_FRAMES: u64 = 600;

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rotorcs=info")))
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.frame_limit.get_or_insert(DEMO_FRAMES);

    let mut renderer = RecordingRenderer::new();
    for (texture, width, height) in DemoScene::textures() {
        renderer.add_texture(texture, width, height);
    }

    let mut input = ScriptedInput::new()
        .idle(10)
        .then([InputEvent::KeyDown(KeyCode::KeyD)])
        .idle(90)
        .then([InputEvent::KeyDown(KeyCode::Space)])
        .idle(60)
        .then([InputEvent::KeyUp(KeyCode::Space), InputEvent::KeyUp(KeyCode::KeyD)])
        .then([InputEvent::KeyDown(KeyCode::KeyS), InputEvent::KeyUp(KeyCode::KeyB)])
        .idle(120)
        .then([InputEvent::KeyUp(KeyCode::KeyS)])
        .idle(30)
        .then([InputEvent::KeyUp(KeyCode::Escape)]);

    let mut scene = DemoScene::new();
    let mut clock = FixedClock::new(16);
    let mut engine = Engine::new(config);

    let frames = engine.run(&mut scene, &mut input, &mut clock, &mut renderer);

    tracing::info!(
        frames,
        presented = renderer.frames_presented(),
        last_frame_draws = renderer.last_frame().len(),
        "demo finished"
    );
    Ok(())
}
