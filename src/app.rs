//! Application lifecycle: initialization, the frame loop and teardown.

use crate::animation::Animator;
use crate::error::{Marble3dError, Result};
use crate::input::{InputState, Viewport};
use crate::render::{RenderOptions, Renderer};
use crate::scene::{Euler, Scene, SceneOptions};
use crate::terminal::{self, Action, Command};
use crossterm::event;
use rand::Rng;
use std::io::Write;
use std::time::{Duration, Instant};

/// Frames-per-second counter, refreshed once a second
struct FrameStats {
    frames_since_last_update: usize,
    last_fps_calculation: Instant,
    fps: f64,
}

impl FrameStats {
    fn new() -> Self {
        FrameStats {
            frames_since_last_update: 0,
            last_fps_calculation: Instant::now(),
            fps: 0.0,
        }
    }

    /// Counts a presented frame and updates the FPS value once a second has elapsed
    fn tick(&mut self) {
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let duration = now.duration_since(self.last_fps_calculation);
        if duration.as_secs_f64() >= 1.0 {
            self.fps = self.frames_since_last_update as f64 / duration.as_secs_f64();
            self.frames_since_last_update = 0;
            self.last_fps_calculation = now;
        }
    }
}

pub struct App {
    scene: Scene,
    renderer: Renderer,
    input: InputState,
    animator: Animator,
    frame_interval: Duration,
    paused: bool,
    debug: bool,
    stats: FrameStats,
}

impl App {
    pub fn new<R: Rng + ?Sized>(
        viewport: Viewport,
        options: SceneOptions,
        render: RenderOptions,
        fps: u32,
        debug: bool,
        rng: &mut R,
    ) -> Self {
        App {
            scene: Scene::new(viewport, options, rng),
            renderer: Renderer::with_options(viewport.width, viewport.height, render),
            input: InputState::new(viewport),
            animator: Animator::new(),
            frame_interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            paused: false,
            debug,
            stats: FrameStats::new(),
        }
    }

    /// Handles one action; returns false when the app should stop
    fn handle(&mut self, action: Action) -> bool {
        match action {
            Action::Input(event) => {
                self.input
                    .apply_event(event, &mut self.scene, &mut self.renderer);
            }
            Action::Command(Command::Quit) => return false,
            Action::Command(Command::TogglePause) => {
                self.paused = !self.paused;
                tracing::info!(paused = self.paused, "pause toggled");
            }
            Action::Command(Command::ToggleDebug) => {
                self.debug = !self.debug;
                tracing::debug!(debug = self.debug, "debug overlay toggled");
            }
            Action::Command(Command::Reset) => {
                if let Some(object) = self.scene.mesh.as_mut() {
                    object.rotation = Euler::default();
                }
                if let Some(particles) = self.scene.particles.as_mut() {
                    particles.rotation = Euler::default();
                }
                self.animator.reset();
                tracing::info!("rotation reset");
            }
        }
        true
    }

    /// Advances and draws one frame
    fn frame(&mut self) {
        if !self.paused {
            self.animator.step(&mut self.scene, self.input.pointer);
        }
        self.renderer.render(&self.scene);
        self.stats.tick();
    }

    fn overlay(&self) -> Vec<String> {
        if !self.debug {
            return Vec::new();
        }
        let mut lines = vec![format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )];
        if let Some(object) = &self.scene.mesh {
            let [tilt_x, tilt_y] = self.animator.parallax();
            lines.push(format!(
                "Rotation X: {:.3}, Y: {:.3} (tilt {:.3}, {:.3})",
                object.rotation.x, object.rotation.y, tilt_x, tilt_y
            ));
        }
        lines.push(format!(
            "Pointer: ({:.2}, {:.2})",
            self.input.pointer.x, self.input.pointer.y
        ));
        let (width, height) = self.renderer.size();
        lines.push(format!("Viewport: {width}x{height}"));
        lines.push(format!("FPS: {:.2}", self.stats.fps));
        lines
    }

    /// Runs until quit. Events arriving between frames are applied before
    /// the next animation step.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let mut deadline = Instant::now();
        loop {
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if event::poll(deadline - now)? {
                    let event = event::read()?;
                    if let Some(action) = terminal::translate(&event) {
                        if !self.handle(action) {
                            tracing::info!(frames = self.animator.frames(), "quitting");
                            return Ok(());
                        }
                    }
                }
            }

            self.frame();
            let banner = self.paused.then_some("Paused");
            terminal::present(out, &self.renderer, &self.overlay(), banner)?;

            deadline += self.frame_interval;
            let now = Instant::now();
            if deadline < now {
                // fell behind, don't try to catch up
                deadline = now;
            }
        }
    }
}

/// Renders `frames` animation steps off-screen and returns the renderer
/// holding the last frame.
pub fn render_offscreen<R: Rng + ?Sized>(
    viewport: Viewport,
    options: SceneOptions,
    render: RenderOptions,
    frames: u64,
    rng: &mut R,
) -> Result<Renderer> {
    if viewport.width == 0 || viewport.height == 0 {
        return Err(Marble3dError::InvalidSize {
            width: viewport.width,
            height: viewport.height,
        });
    }
    let mut scene = Scene::new(viewport, options, rng);
    let mut renderer = Renderer::with_options(viewport.width, viewport.height, render);
    let mut animator = Animator::new();
    let input = InputState::new(viewport);
    for _ in 0..frames {
        animator.step(&mut scene, input.pointer);
    }
    renderer.render(&scene);
    Ok(renderer)
}
