use clap::Parser;
use img2dots::{
    DensityParams, Epsilon, ExtractMode, FixedAdvance, FontMetrics, GlyphMetrics, Puzzle,
    PuzzleConfig, SimplifyParams, Strategy, ThresholdMethod,
};
use rayon::prelude::*;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    /// Contour for shapes with a hole, path otherwise
    Auto,
    Contour,
    Path,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Placement {
    FirstFit,
    Density,
}

#[derive(Parser)]
#[command(name = "img2dots", about = "Silhouette images to connect-the-dots puzzles")]
struct Cli {
    /// Input images (PNG, JPEG, BMP)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Shape extraction mode
    #[arg(long, value_enum, default_value = "auto")]
    mode: Mode,

    /// RDP tolerance in pixels
    #[arg(long, default_value = "15")]
    epsilon: f64,

    /// RDP tolerance as a fraction of the shape's perimeter (overrides --epsilon)
    #[arg(long)]
    epsilon_fraction: Option<f64>,

    /// Drop dots closer than this to the previous one
    #[arg(long)]
    min_distance: Option<f64>,

    /// Insert dots so no gap exceeds this
    #[arg(long)]
    max_distance: Option<f64>,

    /// Reduce to this many dots (Visvalingam-Whyatt)
    #[arg(long)]
    target_count: Option<usize>,

    /// Dot radius in pixels
    #[arg(long, default_value = "10")]
    radius: f64,

    /// Label font size in pixels
    #[arg(long, default_value = "57")]
    font_size: f64,

    /// TrueType/OpenType font for label metrics (fixed-advance estimate if omitted)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Label placement strategy
    #[arg(long, value_enum, default_value = "first-fit")]
    strategy: Placement,

    /// Random candidates per label in density placement
    #[arg(long, default_value = "32")]
    samples: usize,

    /// Seed for density placement
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Fixed brightness threshold (0-255). Otsu auto-detection if omitted.
    #[arg(long)]
    threshold: Option<u8>,

    /// Invert the mask after thresholding
    #[arg(long)]
    invert: bool,

    /// Remove speckles and pinholes before tracing
    #[arg(long)]
    clean: bool,
}

impl Cli {
    fn config(&self) -> PuzzleConfig {
        PuzzleConfig {
            threshold: match self.threshold {
                Some(t) => ThresholdMethod::Fixed(t),
                None => ThresholdMethod::Otsu,
            },
            invert: self.invert,
            clean: self.clean,
            mode: match self.mode {
                Mode::Auto => ExtractMode::Automatic,
                Mode::Contour => ExtractMode::Contour,
                Mode::Path => ExtractMode::Path,
            },
            simplify: SimplifyParams {
                epsilon: match self.epsilon_fraction {
                    Some(f) => Epsilon::ArcFraction(f),
                    None => Epsilon::Absolute(self.epsilon),
                },
                min_distance: self.min_distance,
                max_distance: self.max_distance,
                target_count: self.target_count,
                ..SimplifyParams::default()
            },
            dot_radius: self.radius,
            font_size: self.font_size,
            strategy: match self.strategy {
                Placement::FirstFit => Strategy::FirstFit,
                Placement::Density => Strategy::Density(DensityParams {
                    samples: self.samples,
                    seed: self.seed,
                    ..DensityParams::default()
                }),
            },
            ..PuzzleConfig::default()
        }
    }
}

/// One line per dot: `id x y label_x label_y anchor valid`.
fn format_puzzle(puzzle: &Puzzle) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for dot in &puzzle.dots {
        let (lx, ly, anchor, valid) = match &dot.label {
            Some(l) => (l.position.x, l.position.y, l.anchor.code(), l.valid),
            None => (dot.position.x, dot.position.y, "-", false),
        };
        writeln!(
            out,
            "{} {:.1} {:.1} {:.1} {:.1} {} {}",
            dot.id, dot.position.x, dot.position.y, lx, ly, anchor, valid
        )?;
    }
    Ok(out)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.config();

    let glyphs = match &cli.font {
        Some(path) => Some(GlyphMetrics::load(path)?),
        None => None,
    };
    let fallback = FixedAdvance::default();
    let metrics: &(dyn FontMetrics + Sync) = match &glyphs {
        Some(g) => g,
        None => &fallback,
    };

    // One independent pipeline per image.
    let results: Vec<_> = cli
        .inputs
        .par_iter()
        .map(|path| (path, img2dots::generate_from_file(path, &config, metrics)))
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(puzzle) => {
                for advisory in &puzzle.advisories {
                    log::warn!("{}: {:?}", path.display(), advisory);
                }
                if !puzzle.invalid_labels.is_empty() {
                    log::warn!(
                        "{}: labels needing manual placement: {:?}",
                        path.display(),
                        puzzle.invalid_labels.iter().map(|i| i + 1).collect::<Vec<_>>()
                    );
                }
                println!("# {}", path.display());
                print!("{}", format_puzzle(&puzzle)?);
            }
            Err(e) => {
                log::error!("{}: {} (stage {})", path.display(), e, e.stage());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} images failed", failed, cli.inputs.len()).into());
    }
    Ok(())
}
