use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::ecs::{Priority, Registry};
use crate::events::{KeyDownEvent, KeyUpEvent, QuitEvent};
use crate::input::{InputEvent, InputSource, InputState, KeyCode};
use crate::renderer::Renderer;
use crate::scene::Scene;

// ── Frame clocks ────────────────────────────────────────────────────────────

/// Monotonic millisecond source sampled once per frame.
pub trait FrameClock {
    fn now_ms(&mut self) -> u64;
}

/// Wall-clock time since construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Advances by a fixed step on every sample. Deterministic; used headless.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: u64,
    step: u64,
}

impl FixedClock {
    pub fn new(step_ms: u64) -> Self {
        Self { now: 0, step: step_ms }
    }
}

impl FrameClock for FixedClock {
    fn now_ms(&mut self) -> u64 {
        let now = self.now;
        self.now += self.step;
        now
    }
}

// ── Engine ──────────────────────────────────────────────────────────────────

/// Drives a [`Registry`] through Input → Update → Render until asked to stop.
///
/// A [`QuitEvent`] or releasing Escape stops the loop, as does reaching
/// [`EngineConfig::frame_limit`].
pub struct Engine {
    registry: Registry,
    config: EngineConfig,
    input: InputState,
    running: Rc<Cell<bool>>,
    frames: u64,
    polled: Vec<InputEvent>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
            input: InputState::new(),
            running: Rc::new(Cell::new(false)),
            frames: 0,
            polled: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn request_quit(&self) {
        self.running.set(false);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Hooks up the quit handlers, lets `scene` populate the registry and runs
    /// the initialize pass.
    pub fn initialize(&mut self, scene: &mut dyn Scene) {
        let running = Rc::clone(&self.running);
        self.registry.subscribe::<QuitEvent>(move |_, _| running.set(false));
        let running = Rc::clone(&self.running);
        self.registry.subscribe::<KeyUpEvent>(move |_, event| {
            if event.key == KeyCode::Escape {
                running.set(false);
            }
        });

        scene.on_enter(&mut self.registry, &self.config);
        self.registry.run_systems_initialize();
        self.running.set(true);
        tracing::info!(
            scene = scene.name(),
            systems = self.registry.system_count(),
            entities = self.registry.entity_count(),
            "engine initialized"
        );
    }

    /// Drains `source` and publishes every event immediately on the registry's bus.
    pub fn process_input(&mut self, source: &mut dyn InputSource) {
        self.input.clear_frame_state();
        self.polled.clear();
        source.poll(&mut self.polled);

        for &event in &self.polled {
            self.input.apply(event);
            match event {
                InputEvent::Quit => {
                    tracing::info!("quit requested");
                    self.registry.emit(QuitEvent, Priority::Immediate);
                }
                InputEvent::KeyDown(key) => self.registry.emit(KeyDownEvent { key }, Priority::Immediate),
                InputEvent::KeyUp(key) => self.registry.emit(KeyUpEvent { key }, Priority::Immediate),
            }
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.registry.run_systems_update(dt);
    }

    pub fn render(&mut self, renderer: &mut dyn Renderer) {
        renderer.clear(self.config.clear_color());
        self.registry.run_systems_render(renderer);
        renderer.present();
    }

    /// One full frame. Update and render are skipped once the engine has stopped.
    pub fn step(&mut self, source: &mut dyn InputSource, renderer: &mut dyn Renderer, dt: f32) {
        self.process_input(source);
        if !self.is_running() {
            return;
        }
        self.update(dt);
        self.render(renderer);
        self.frames += 1;
    }

    /// Clamps a millisecond delta to `0..=max_delta` seconds.
    pub fn delta_seconds(&self, elapsed_ms: u64) -> f32 {
        (elapsed_ms as f32 / 1000.0).min(self.config.max_delta)
    }

    /// Initializes `scene`, loops until stopped, then tears everything down.
    /// Returns the number of frames rendered.
    pub fn run(
        &mut self,
        scene: &mut dyn Scene,
        source: &mut dyn InputSource,
        clock: &mut dyn FrameClock,
        renderer: &mut dyn Renderer,
    ) -> u64 {
        self.initialize(scene);
        let mut last = clock.now_ms();

        while self.is_running() {
            if self.config.frame_limit.is_some_and(|limit| self.frames >= limit) {
                tracing::info!(frames = self.frames, "frame limit reached");
                break;
            }
            let now = clock.now_ms();
            let dt = self.delta_seconds(now.saturating_sub(last));
            last = now;
            self.step(source, renderer, dt);
        }

        self.shutdown(scene);
        self.frames
    }

    pub fn shutdown(&mut self, scene: &mut dyn Scene) {
        self.running.set(false);
        scene.on_exit(&mut self.registry);
        self.registry.shutdown();
        tracing::info!(frames = self.frames, "engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_steps() {
        let mut clock = FixedClock::new(16);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 16);
        assert_eq!(clock.now_ms(), 32);
    }

    #[test]
    fn delta_is_clamped() {
        let engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.delta_seconds(16), 0.016);
        assert_eq!(engine.delta_seconds(1000), 0.05);
    }
}
