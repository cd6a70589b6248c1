use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use palette::{FromColor, Hsl, Srgb};
use rayon::prelude::*;
use swarm_common::{RenderTag, Snapshot};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about = "Renders recorded swarm snapshots to PNG frames", long_about = None)]
struct Args {
    /// Input snapshot file (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the PNG frames are written to
    #[arg(short, long, default_value = "frames")]
    output_dir: PathBuf,

    /// Width of each frame in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Height of each frame in pixels (derived from the domain aspect ratio if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Particle radius in simulation units
    #[arg(long, default_value_t = 2.5)]
    particle_scale: f64,

    /// How neighbor counts map to colors
    #[arg(long, value_enum, default_value_t = ColorMode::Gradient)]
    color_mode: ColorMode,

    /// Render only every Nth snapshot
    #[arg(long, default_value_t = 1)]
    every: usize,

    /// Skip ghost copies at the edges
    #[arg(long)]
    no_ghosts: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ColorMode {
    /// Hue slides from red towards green and lightness rises with neighbor count
    Gradient,
    /// Fixed color bands by neighbor count
    Bands,
}

const BACKGROUND: [u8; 4] = [0x59, 0x16, 0x01, 255]; // dark red
const PRIMARY: [u8; 4] = [0xFF, 0xFF, 0xFF, 255];
const SECONDARY: [u8; 4] = [0xC0, 0xC0, 0xC0, 255];

// Band thresholds, checked from the top: (neighbors greater than, color)
const COLOR_BANDS: &[(u32, [u8; 4])] = &[
    (35, [0xF8, 0xE3, 0x02, 255]), // yellow
    (18, [0x00, 0x64, 0xFF, 255]), // blue
    (15, [0xFF, 0x07, 0x92, 255]), // magenta
    (12, [0xA4, 0x71, 0x4B, 255]), // brown
];
const BAND_DEFAULT: [u8; 4] = [0x00, 0xC2, 0x00, 255]; // green

/// Pixel geometry shared by every frame.
#[derive(Debug, Clone, Copy)]
struct FrameLayout {
    width: u32,
    height: u32,
    pixels_per_unit: f64,
    radius_px: i32,
}

impl FrameLayout {
    fn new(args: &Args, domain_width: f64, domain_height: f64) -> Result<Self> {
        if !(domain_width > 0.0 && domain_height > 0.0) {
            anyhow::bail!("Snapshot domain {}x{} is not drawable.", domain_width, domain_height);
        }
        let pixels_per_unit = args.width as f64 / domain_width;
        let height = args
            .height
            .unwrap_or_else(|| (domain_height * pixels_per_unit).round().max(1.0) as u32);
        let radius_px = (args.particle_scale * pixels_per_unit).round().max(1.0) as i32;
        Ok(FrameLayout { width: args.width, height, pixels_per_unit, radius_px })
    }

    #[inline]
    fn to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x * self.pixels_per_unit).round() as i32,
            (y * self.pixels_per_unit).round() as i32,
        )
    }
}

/// Color for a particle or ghost. Tags take precedence over neighbor count.
fn particle_color(neighbor_count: u32, tag: RenderTag, mode: ColorMode) -> [u8; 4] {
    match tag {
        RenderTag::Primary => return PRIMARY,
        RenderTag::Secondary => return SECONDARY,
        RenderTag::None => {}
    }
    match mode {
        ColorMode::Gradient => {
            let n = neighbor_count as f32;
            let hue = 10.0 - 4.4 * n;
            let lightness = ((20.0 + 1.1 * n) / 100.0).min(1.0);
            let rgb = Srgb::from_color(Hsl::new(hue, 1.0, lightness));
            [
                (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
                (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
                (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
                255,
            ]
        }
        ColorMode::Bands => COLOR_BANDS
            .iter()
            .find(|(threshold, _)| neighbor_count > *threshold)
            .map(|(_, color)| *color)
            .unwrap_or(BAND_DEFAULT),
    }
}

/// Draws one snapshot.
fn draw_frame(snapshot: &Snapshot, layout: &FrameLayout, mode: ColorMode, ghosts: bool) -> RgbaImage {
    let mut image = ImageBuffer::from_pixel(layout.width, layout.height, Rgba(BACKGROUND));

    for particle in &snapshot.particles {
        let color = Rgba(particle_color(particle.neighbor_count, particle.render_tag, mode));
        draw_filled_circle_mut(&mut image, layout.to_pixel(particle.x, particle.y), layout.radius_px, color);

        if ghosts {
            // Ghosts sit just outside the domain; the part that overlaps the frame is drawn.
            for ghost in &particle.ghosts {
                let color = Rgba(particle_color(ghost.neighbor_count, ghost.render_tag, mode));
                draw_filled_circle_mut(&mut image, layout.to_pixel(ghost.x, ghost.y), layout.radius_px, color);
            }
        }
    }
    image
}

/// Loads snapshots, picking the decoder from the file extension.
fn load_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let snapshots = match extension {
        "json" => serde_json::from_reader(reader).context("Failed to decode JSON snapshots")?,
        "bin" => bincode::deserialize_from(reader).context("Failed to decode bincode snapshots")?,
        "msgpack" => rmp_serde::from_read(reader).context("Failed to decode MessagePack snapshots")?,
        other => anyhow::bail!("Unknown snapshot extension '{}' (expected json, bin or msgpack).", other),
    };
    Ok(snapshots)
}

fn main() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Swarm Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output_dir.display());

    let snapshots = load_snapshots(&args.input)?;
    let Some(first) = snapshots.first() else {
        warn!("No snapshots in {}. Nothing to render.", args.input.display());
        return Ok(());
    };
    info!("Loaded {} snapshots ({} particles each).", snapshots.len(), first.particle_count());

    let layout = FrameLayout::new(&args, first.width, first.height)?;
    debug!("Frame layout: {:?}", layout);
    if snapshots.iter().any(|s| s.width != first.width || s.height != first.height) {
        warn!("Snapshots span more than one domain size; frames are scaled to the first.");
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create '{}'", args.output_dir.display()))?;

    let every = args.every.max(1);
    let selected: Vec<(usize, &Snapshot)> = snapshots.iter().enumerate().step_by(every).collect();

    let progress = ProgressBar::new(selected.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta})")
            .context("Invalid progress template")?,
    );

    let start = Instant::now();
    selected
        .par_iter()
        .map(|(index, snapshot)| {
            let image = draw_frame(snapshot, &layout, args.color_mode, !args.no_ghosts);
            let path = args.output_dir.join(format!("frame_{:05}.png", index));
            image
                .save(&path)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            progress.inc(1);
            Ok(())
        })
        .collect::<Result<Vec<()>>>()?;
    progress.finish();

    info!(
        "Rendered {} frames in {:.2} s.",
        selected.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_common::{GhostView, ParticleView};

    fn args() -> Args {
        Args {
            input: PathBuf::from("in.json"),
            output_dir: PathBuf::from("out"),
            width: 200,
            height: None,
            particle_scale: 2.5,
            color_mode: ColorMode::Gradient,
            every: 1,
            no_ghosts: false,
        }
    }

    #[test]
    fn tags_override_counts() {
        assert_eq!(particle_color(50, RenderTag::Primary, ColorMode::Bands), PRIMARY);
        assert_eq!(particle_color(0, RenderTag::Secondary, ColorMode::Gradient), SECONDARY);
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(particle_color(0, RenderTag::None, ColorMode::Bands), BAND_DEFAULT);
        assert_eq!(particle_color(12, RenderTag::None, ColorMode::Bands), BAND_DEFAULT);
        assert_eq!(particle_color(13, RenderTag::None, ColorMode::Bands), COLOR_BANDS[3].1);
        assert_eq!(particle_color(19, RenderTag::None, ColorMode::Bands), COLOR_BANDS[1].1);
        assert_eq!(particle_color(36, RenderTag::None, ColorMode::Bands), COLOR_BANDS[0].1);
    }

    #[test]
    fn gradient_brightens_with_crowding() {
        let sparse = particle_color(0, RenderTag::None, ColorMode::Gradient);
        let crowded = particle_color(30, RenderTag::None, ColorMode::Gradient);
        let luma = |c: [u8; 4]| c[0] as u32 + c[1] as u32 + c[2] as u32;
        assert!(luma(crowded) > luma(sparse));
        // Lone particles are a dark red.
        assert!(sparse[0] > sparse[1] && sparse[0] > sparse[2]);
    }

    #[test]
    fn layout_keeps_aspect_ratio() {
        let layout = FrameLayout::new(&args(), 100.0, 50.0).unwrap();
        assert_eq!((layout.width, layout.height), (200, 100));
        assert_eq!(layout.radius_px, 5);
        assert_eq!(layout.to_pixel(50.0, 25.0), (100, 50));
    }

    #[test]
    fn draws_particles_and_edge_ghosts() {
        let layout = FrameLayout::new(&args(), 100.0, 50.0).unwrap();
        let snapshot = Snapshot {
            step: 0,
            width: 100.0,
            height: 50.0,
            particles: vec![ParticleView {
                x: 99.0,
                y: 25.0,
                heading: 0.0,
                neighbor_count: 0,
                render_tag: RenderTag::Primary,
                ghosts: vec![GhostView { x: -1.0, y: 25.0, neighbor_count: 0, render_tag: RenderTag::Primary }],
            }],
        };
        let image = draw_frame(&snapshot, &layout, ColorMode::Gradient, true);
        assert_eq!(image.get_pixel(198, 50).0, PRIMARY);
        assert_eq!(image.get_pixel(0, 50).0, PRIMARY);
        assert_eq!(image.get_pixel(100, 10).0, BACKGROUND);

        let image = draw_frame(&snapshot, &layout, ColorMode::Gradient, false);
        assert_eq!(image.get_pixel(0, 50).0, BACKGROUND);
    }
}
