mod animation;
mod app;
mod cli;
mod error;
mod geometry;
mod graphics;
mod input;
mod math;
mod render;
mod scene;
mod shadow;
mod terminal;
mod texture;
mod vertex;

use anyhow::Context;
use app::{render_offscreen, App};
use clap::Parser;
use cli::Cli;
use input::Viewport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use render::RenderOptions;
use scene::SceneOptions;
use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::Mutex;
use terminal::{cells_to_viewport, terminal_cells, TerminalGuard};
use tracing_subscriber::EnvFilter;

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter));

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // stdout and stderr belong to the terminal UI otherwise
        None if cli.is_headless() => builder.with_writer(io::stderr).init(),
        None => {}
    }
    Ok(())
}

/// Main function
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let options = SceneOptions {
        particles: !cli.no_particles,
    };
    let render_options = RenderOptions {
        antialias: !cli.no_antialias,
    };

    if let Some(path) = &cli.export_texture {
        let marble = texture::synthesize_marble(&mut rng);
        texture::write_png(&marble, path)
            .with_context(|| format!("failed to export texture to {}", path.display()))?;
        tracing::info!(path = %path.display(), "texture exported");
        return Ok(());
    }

    if let Some(path) = &cli.snapshot {
        let viewport = Viewport::new(cli.width, cli.height);
        let renderer = render_offscreen(viewport, options, render_options, cli.frames, &mut rng)
            .context("failed to render snapshot")?;
        texture::write_png(&renderer.to_raster(), path)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        tracing::info!(path = %path.display(), frames = cli.frames, "snapshot written");
        return Ok(());
    }

    let (cols, rows) = terminal_cells();
    let viewport = cells_to_viewport(cols, rows);
    let mut app = App::new(
        viewport,
        options,
        render_options,
        cli.fps,
        cli.debug,
        &mut rng,
    );

    let mut guard =
        TerminalGuard::enter(BufWriter::new(io::stdout())).context("failed to set up terminal")?;
    let result = app.run(guard.writer());
    drop(guard);

    result.context("render loop failed")?;
    Ok(())
}
