//! cardscan CLI.
//!
//! `cardscan run` processes a directory of card photographs into one JSON
//! record per character. `cardscan patch` applies an operator text override
//! to an existing record, re-deriving its effects and statistics.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use cardscan::config::PipelineConfig;
use cardscan::pipeline::{CharacterJob, Pipeline, run_batch};
use cardscan::record::CharacterRecord;

#[derive(Parser)]
#[command(name = "cardscan", about = "Card photograph → structured game data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a directory of card images into JSON records.
    Run {
        /// Directory containing <id>_front.<ext> / <id>_back.<ext> pairs.
        #[arg(long)]
        images: PathBuf,
        /// Output directory for the per-character JSON records.
        #[arg(long)]
        out: PathBuf,
        /// Pipeline configuration file (JSON). Defaults are used when
        /// omitted; an explicit file must carry the dice constants.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Season/collection label stored in each record.
        #[arg(long, default_value = "1")]
        season: String,
        /// Worker thread override.
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Override one tier's text in an existing record and re-derive its
    /// statistics.
    Patch {
        /// Path to the record JSON to patch in place.
        #[arg(long)]
        record: PathBuf,
        #[arg(long)]
        ability: String,
        /// Tier number, 1-4.
        #[arg(long)]
        level: u8,
        /// Corrected tier text.
        #[arg(long)]
        text: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match Cli::parse().command {
        Command::Run { images, out, config, season, workers } => {
            let mut config = PipelineConfig::load(config.as_deref())?;
            if let Some(w) = workers {
                config.runtime.workers = w;
                config.validate()?;
            }
            run(&config, &images, &out, &season)
        }
        Command::Patch { record, ability, level, text, config } => {
            let config = PipelineConfig::load(config.as_deref())?;
            patch(&config, &record, &ability, level, &text)
        }
    }
}

fn run(config: &PipelineConfig, images: &Path, out: &Path, season: &str) -> Result<()> {
    let jobs = discover_jobs(images, season)?;
    if jobs.is_empty() {
        bail!("no *_front/*_back image pairs found in {}", images.display());
    }
    log::info!("processing {} characters with {} workers", jobs.len(), config.runtime.workers);

    std::fs::create_dir_all(out)
        .with_context(|| format!("create output directory {}", out.display()))?;

    let pipeline = Pipeline::from_config(config)?;
    let records = run_batch(&pipeline, jobs);

    let mut total_findings = 0usize;
    for record in &records {
        let path = out.join(format!("{}.json", record.id));
        record.save(&path)?;
        total_findings += record.findings.len();
        for finding in &record.findings {
            log::info!("{}: {finding}", record.id);
        }
    }

    println!(
        "wrote {} records to {} ({total_findings} findings for review)",
        records.len(),
        out.display()
    );
    Ok(())
}

fn patch(
    config: &PipelineConfig,
    record_path: &Path,
    ability: &str,
    level: u8,
    text: &str,
) -> Result<()> {
    let mut record = CharacterRecord::load(record_path)?;
    record.apply_text_override(
        ability,
        level,
        text,
        &config.dice.table,
        &config.dice.base_pool,
    )?;
    record.save(record_path)?;
    println!("patched {} {ability} L{level}", record.id);
    Ok(())
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Finds `<id>_front.<ext>` files with a matching back face.
fn discover_jobs(images: &Path, season: &str) -> Result<Vec<CharacterJob>> {
    let entries = std::fs::read_dir(images)
        .with_context(|| format!("read image directory {}", images.display()))?;

    let mut jobs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else { continue };
        if !IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let Some(id) = stem.strip_suffix("_front") else { continue };

        let back = IMAGE_EXTENSIONS
            .iter()
            .map(|e| images.join(format!("{id}_back.{e}")))
            .find(|p| p.exists());
        match back {
            Some(back_path) => jobs.push(CharacterJob {
                id: id.to_string(),
                season: season.to_string(),
                front_path: path,
                back_path,
            }),
            None => log::warn!("{id}: front image without a back image, skipping"),
        }
    }

    jobs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(jobs)
}
