use clap::Parser;
use std::path::PathBuf;

/// A rotating marble torus knot with drifting gold dust, drawn in the terminal.
///
/// Move the mouse to tilt the knot. Keys: q/Esc quit, p pause, d debug
/// overlay, r reset rotation.
#[derive(Debug, Parser)]
#[command(name = "marble3d", version, about)]
pub struct Cli {
    /// Target frames per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Seed for the marble veins and particle positions
    #[arg(long)]
    pub seed: Option<u64>,

    /// Leave out the gold dust particles
    #[arg(long)]
    pub no_particles: bool,

    /// Render at output resolution without supersampling
    #[arg(long)]
    pub no_antialias: bool,

    /// Start with the debug overlay shown
    #[arg(short, long)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Write the generated marble texture as PNG and exit
    #[arg(long, value_name = "PATH")]
    pub export_texture: Option<PathBuf>,

    /// Render off-screen and write the final frame as PNG, then exit
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Snapshot width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Snapshot height in pixels
    #[arg(long, default_value_t = 360)]
    pub height: u32,

    /// Animation steps to run before taking the snapshot
    #[arg(long, default_value_t = 1)]
    pub frames: u64,
}

impl Cli {
    /// True when the run writes files instead of taking over the terminal
    pub fn is_headless(&self) -> bool {
        self.export_texture.is_some() || self.snapshot.is_some()
    }
}
