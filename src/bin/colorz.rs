use clap::Parser;
use std::fs;
use std::path::PathBuf;
use colorz::{EmptyClusterPolicy, KMeansOptions, Options, Strategy, extract_palette, format};
use anyhow::Context;
use anyhow::Result;

/// Extract a palette of representative colors from an image.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input image path
    #[arg(short, long = "file")]
    file: PathBuf,

    /// Strategy {dominant|k-means}|{d|k}
    #[arg(short, long, default_value = "k-means")]
    strategy: String,

    /// Number of colors
    #[arg(short, long, default_value_t = 3)]
    colors: usize,

    /// Shrink so the longest side is at most this many pixels first
    #[arg(long)]
    downscale: Option<u32>,

    /// Ignore fully transparent pixels
    #[arg(long)]
    skip_transparent: bool,

    /// Seed for the k-means initial centers
    #[arg(long)]
    seed: Option<u64>,

    /// Stop once no k-means center moves this far
    #[arg(long, default_value_t = colorz::kmeans::DEFAULT_MIN_DIFF)]
    min_diff: f64,

    /// Give up on convergence after this many k-means iterations
    #[arg(long, default_value_t = colorz::kmeans::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Refill clusters that run empty instead of failing
    #[arg(long)]
    reseed_empty: bool,

    /// Print the palette as a JSON array
    #[arg(long)]
    json: bool,

    /// Also write the palette as a PNG strip
    #[arg(long)]
    swatch: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let strategy: Strategy = args.strategy.parse()?;
    let options = Options {
        downscale: args.downscale,
        skip_transparent: args.skip_transparent,
        kmeans: KMeansOptions {
            min_diff: args.min_diff,
            max_iterations: args.max_iterations,
            seed: args.seed,
            empty_clusters: if args.reseed_empty {
                EmptyClusterPolicy::Reseed
            } else {
                EmptyClusterPolicy::Fail
            },
        },
    };

    let img = image::open(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let palette = extract_palette(&img, strategy, args.colors, &options)
        .with_context(|| format!("{strategy} palette extraction failed"))?;
    let hex = palette.iter().map(|c| format::hex(*c)).collect::<Vec<_>>();

    if args.json {
        println!("{}", serde_json::to_string(&hex)?);
    } else {
        for hex_string in &hex {
            println!("rgb: {hex_string}");
        }
    }

    if let Some(out_path) = &args.swatch {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(out_path, format::swatch_png(&palette, 32)?)?;
        log::info!("saved swatch to {}", out_path.display());
    }

    Ok(())
}
