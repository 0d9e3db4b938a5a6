mod config;
mod errors;
mod geometry;
mod grid;
mod image_io;
mod labeling;
mod output;
mod pipeline;
mod projection;
mod snake;
mod spline;
mod structure;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use rayon::prelude::*;

use config::{Config, EquatorChoice};
use errors::{Result, WingMorphError};
use image_io::{get_png_files_in_dir, load_image};
use pipeline::{process_image, process_structure};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "WingMorph - Structure Morphometry and Projection")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Treat the input as structure geometry JSON and generate a
    /// projection grid instead of labeling an image
    #[clap(short, long)]
    structure: bool,

    /// Equator boundary for grid projection (overwrites config)
    #[clap(short, long)]
    equator: Option<EquatorArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EquatorArg {
    A,
    B,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Load configuration; fall back to defaults when no file is present
    let mut config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_dir = output;
    }
    if let Some(equator) = args.equator {
        config.equator = match equator {
            EquatorArg::A => EquatorChoice::A,
            EquatorArg::B => EquatorChoice::B,
        };
    }
    config.validate()?;

    let start_time = Instant::now();
    fs::create_dir_all(&config.output_dir)?;

    let input_path = PathBuf::from(&config.input_path);

    if args.structure {
        if !input_path.is_file() {
            return Err(WingMorphError::Config(
                "structure mode requires a single geometry JSON file".to_string(),
            ));
        }
        println!("Projecting structure: {}", input_path.display());
        let grid_path = process_structure(&input_path, &config)?;
        println!("Grid written to {}", grid_path.display());
    } else if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        let input_image = load_image(&input_path)?;
        process_image(input_image, &config)?;
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let png_files = get_png_files_in_dir(&input_path)?;
        println!("Found {} PNG files", png_files.len());

        if config.use_parallel {
            png_files
                .par_iter()
                .for_each(|path| match load_image(path) {
                    Ok(input_image) => {
                        if let Err(e) = process_image(input_image, &config) {
                            eprintln!("Error processing {}: {}", path.display(), e);
                        }
                    }
                    Err(e) => eprintln!("Error loading {}: {}", path.display(), e),
                });
        } else {
            for path in &png_files {
                println!("Processing: {}", path.display());
                let input_image = load_image(path)?;
                process_image(input_image, &config)?;
            }
        }
    } else {
        return Err(WingMorphError::InvalidPath(input_path));
    }

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
