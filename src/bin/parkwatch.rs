//! parkwatch - count free and occupied parking spots in an image or video.
//!
//! Loads the spot mask and classifier once, runs the requested pipeline,
//! writes the annotated output file and prints the counts as JSON on stdout.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use parkwatch::ui::{Ui, UiMode};
use parkwatch::{BackendKind, ParkingPipeline, ParkwatchConfig};

#[derive(Parser, Debug)]
#[command(name = "parkwatch", author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "PARKWATCH_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Spot mask image (white spots on black).
    #[arg(long, value_name = "PATH")]
    mask: Option<PathBuf>,
    /// Classifier artifact.
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,
    /// Classifier backend (tract|linear|threshold).
    #[arg(long, value_name = "NAME")]
    backend: Option<BackendKind>,
    /// Sampling period in frames.
    #[arg(long)]
    step: Option<u32>,
    /// Relative change cut for reclassification.
    #[arg(long, value_name = "X")]
    change_threshold: Option<f64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every spot of a single image.
    Image {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
        /// Annotated JPEG output.
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Render an annotated copy of a video.
    Video {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
        /// Annotated MP4 output.
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::new(UiMode::parse(Some(&args.ui)), std::io::stderr().is_terminal());

    let config = {
        let _stage = ui.stage("Load configuration");
        load_config(&args)?
    };
    let pipeline = {
        let _stage = ui.stage("Load mask + classifier");
        ParkingPipeline::from_config(&config)?
    };
    log::info!(
        "{} spots, backend '{}', step {}, change threshold {}",
        pipeline.spots().len(),
        pipeline.classifier().name(),
        config.sampling.step,
        config.sampling.change_threshold
    );

    match &args.command {
        Command::Image { input, output } => {
            let bytes = std::fs::read(input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let result = {
                let _stage = ui.stage("Classify image");
                pipeline.process_image(&bytes)?
            };
            write_output(output, &result.bytes)?;
            println!("{}", serde_json::to_string_pretty(&result.summary)?);
        }
        Command::Video { input, output } => {
            let bytes = std::fs::read(input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let result = {
                let _stage = ui.stage("Render video");
                let mut progress = ui.video_progress();
                let result = pipeline.process_video_with(&bytes, |tick| progress.on_frame(tick));
                progress.finish();
                result?
            };
            write_output(output, &result.bytes)?;
            println!("{}", serde_json::to_string_pretty(&result.report)?);
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<ParkwatchConfig> {
    let mut config = ParkwatchConfig::load_from(args.config.as_deref())?;
    if let Some(mask) = &args.mask {
        config.mask_path = mask.clone();
    }
    if let Some(model) = &args.model {
        config.classifier.model_path = model.clone();
    }
    if let Some(backend) = args.backend {
        config.classifier.backend = backend;
    }
    if let Some(step) = args.step {
        config.sampling.step = step;
    }
    if let Some(threshold) = args.change_threshold {
        config.sampling.change_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(anyhow!("refusing to write empty output to {}", path.display()));
    }
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
