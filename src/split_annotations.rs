/*
cargo run --bin split_annotations -- \
    -i data/surgery/train/via_region_data.json \
    -o data/surgery/splits

cargo run --bin split_annotations -- \
    -i data/surgery/train/via_region_data.json \
    -p data/surgery/split_map.json \
    -o data/surgery/splits_fixed
*/

use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use annotation_split::{split_explicit, split_random, Annotations, PartitionSpec, SplitRatios};
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{info, warn};
use serde_json::Value;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, LevelFilter, TermLogger, TerminalMode,
    WriteLogger,
};

#[derive(Parser, Debug)]
#[command(version, about = "Split an annotation JSON document into train/val/test files")]
struct Args {
    // Annotation document: {key: {"filename": ..., ...}, ...}
    #[arg(short, long)]
    input: PathBuf,

    // Optional {"train": [...], "val": [...]} filename lists; an empty object means random split
    #[arg(short, long, value_name = "PATH")]
    partition_spec: Option<PathBuf>,

    // Train ratio for random mode
    #[arg(short = 'r', long, default_value = "0.6")]
    train_ratio: f64,

    // Validation ratio for random mode (test takes the rest)
    #[arg(short = 'v', long, default_value = "0.2")]
    val_ratio: f64,

    // Output directory for the three JSONs
    #[arg(short, long, default_value = "output_splits")]
    output_dir: PathBuf,

    // Log directory (defaults to <output-dir>/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Validate before touching the filesystem
    let ratios = SplitRatios::new(args.train_ratio, args.val_ratio)?;

    // logging setup
    create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| args.output_dir.join("logs"));
    create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("split_annotations_{ts}.log"));
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            LogConfig::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Info,
            LogConfig::default(),
            File::create(&log_path)
                .with_context(|| format!("Failed to create {}", log_path.display()))?,
        ),
    ])?;

    info!("Starting annotation splitter");
    info!("Input file: {:?}", args.input);

    let annotations = read_annotations(&args.input)?;
    info!("Loaded {} annotations", annotations.len());

    let spec = match &args.partition_spec {
        Some(path) => read_partition_spec(path)?,
        None => None,
    };

    let splits = match &spec {
        Some(spec) => {
            info!(
                "Explicit split: {} train filenames, {} val filenames",
                spec.train.len(),
                spec.val.len()
            );
            split_explicit(&annotations, spec)?
        }
        None => {
            info!(
                "Random split - Train: {}, Val: {}, Test: {:.2}",
                ratios.train(),
                ratios.val(),
                ratios.test()
            );
            split_random(&annotations, ratios)
        }
    };

    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("annotations");

    let (train, val, test) = splits.into_tuple();
    for (name, part) in [("train", &train), ("val", &val), ("test", &test)] {
        if part.is_empty() {
            warn!("{} split is empty", name);
        }
        let path = args.output_dir.join(format!("{stem}_{name}.json"));
        write_json(&path, part)?;
        info!("Wrote {} annotations to {:?}", part.len(), path);
    }

    info!("All done successfully.");
    Ok(())
}

fn read_annotations(path: &Path) -> Result<Annotations> {
    let file = File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} must be a JSON object of annotations", path.display()))
}

// None when the spec document is an empty object
fn read_partition_spec(path: &Path) -> Result<Option<PartitionSpec>> {
    let file = File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Bad JSON in {}", path.display()))?;

    if value.as_object().is_some_and(|obj| obj.is_empty()) {
        warn!("Partition spec {:?} is empty, falling back to random split", path);
        return Ok(None);
    }
    let spec = PartitionSpec::from_value(&value)
        .with_context(|| format!("Invalid partition spec {}", path.display()))?;
    Ok(Some(spec))
}

fn write_json(path: &Path, data: &Annotations) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to write {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data)?;
    Ok(())
}
