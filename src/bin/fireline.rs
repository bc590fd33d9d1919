//! fireline - run detection on one image from the command line

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

use fireline::{DetectionRequest, DetectionService, FirelineConfig, Frame};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image to analyze (JPEG or PNG).
    #[arg(long)]
    image: PathBuf,
    /// COLOR, THERMAL or SPLIT. Unknown values are treated as COLOR.
    #[arg(long, default_value = "COLOR")]
    stream_type: String,
    /// LEFT_RIGHT or TOP_BOTTOM, for SPLIT frames.
    #[arg(long)]
    split_layout: Option<String>,
    /// Confidence threshold; defaults to the configured value.
    #[arg(long)]
    confidence: Option<f32>,
    /// Stream identifier echoed in the response.
    #[arg(long)]
    stream_id: Option<String>,
    /// Skip detection but still record the request.
    #[arg(long)]
    disabled: bool,
    /// Run the same frame this many times.
    #[arg(long, default_value_t = 1)]
    repeat: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = FirelineConfig::load()?;
    let service = DetectionService::from_config(&cfg);

    let image = image::open(&args.image)
        .with_context(|| format!("failed to decode image {}", args.image.display()))?;
    let frame = Frame::from(image.to_rgb8());
    log::info!(
        "loaded {} ({}x{})",
        args.image.display(),
        frame.width(),
        frame.height()
    );

    let request = DetectionRequest {
        stream_id: args.stream_id,
        enable_detection: !args.disabled,
        confidence_threshold: args.confidence,
        stream_type: Some(args.stream_type),
        split_layout: args.split_layout,
    };

    let mut last = None;
    for _ in 0..args.repeat.max(1) {
        last = Some(service.detect(&frame, &request)?);
    }

    let output = json!({
        "response": last,
        "stats": service.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
