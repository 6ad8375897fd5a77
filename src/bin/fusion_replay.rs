//! fusion_replay - replay recorded detector results through the fusion core
//!
//! Input is JSON lines, one detector completion per line (see
//! `activity_fusion::replay`). Every stabilized label change is printed
//! with the input line it happened on.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use activity_fusion::replay::parse_line;
use activity_fusion::{ChannelDisplaySink, FusionConfig, FusionEngine};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines file of recorded detector results.
    input: PathBuf,
    /// Override the smoothing window.
    #[arg(long)]
    window: Option<usize>,
    /// Print changes as JSON objects instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ChangeRecord<'a> {
    line: usize,
    status: &'a str,
    color: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut cfg = FusionConfig::load()?;
    if let Some(window) = args.window {
        if window == 0 {
            return Err(anyhow!("--window must be >= 1"));
        }
        cfg.smoothing_window = window;
    }

    let (display, labels) = ChannelDisplaySink::new();
    let engine = FusionEngine::new(cfg.fusion_settings(), Arc::new(display));

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let mut records = 0usize;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {}", line_no))?;
        let record = match parse_line(&line).with_context(|| format!("line {}", line_no))? {
            Some(record) => record,
            None => continue,
        };
        engine.handle(record.into_event())?;
        records += 1;

        while let Ok(update) = labels.try_recv() {
            if args.json {
                let change = ChangeRecord {
                    line: line_no,
                    status: update.label,
                    color: update.color.hex(),
                };
                println!("{}", serde_json::to_string(&change)?);
            } else {
                println!("line {:>5}: {} [{}]", line_no, update.label, update.color.hex());
            }
        }
    }

    let stats = engine.stats()?;
    log::info!(
        "replayed {} records (pose={}, object={}), {} label changes",
        records,
        stats.pose_updates,
        stats.object_updates,
        stats.label_changes
    );
    Ok(())
}
