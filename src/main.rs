//! notestyle - command-line front end
//!
//! Styles one markdown note the way an editor would on load and prints
//! what the engine produced:
//!
//! ```text
//! notestyle <note.md> [--roundtrip] [--no-images] [--dark]
//! ```
//!
//! Without flags a summary of the attribute runs is printed. `--roundtrip`
//! prints the markdown source recovered from the styled document instead.

use clap::Parser;
use log::{error, info};
use notestyle::config::load_config;
use notestyle::document::{AttributeKey, Document};
use notestyle::markdown::rescan::default_project_root;
use notestyle::markdown::{NoteContext, RescanController};
use notestyle::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Application name constant.
const APP_NAME: &str = "notestyle";

/// How long to wait for background highlighting and image loads.
const PENDING_TIMEOUT: Duration = Duration::from_secs(30);

/// notestyle - style a markdown note and report what the engine produced
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(version, about, long_about = None)]
struct Args {
    /// Markdown note to style
    #[arg(value_name = "NOTE")]
    note: PathBuf,

    /// Print the markdown source recovered from the styled document
    #[arg(long)]
    roundtrip: bool,

    /// Skip resolving image previews
    #[arg(long)]
    no_images: bool,

    /// Use the dark palette
    #[arg(long)]
    dark: bool,
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config();
    config.live_image_preview_enabled &= !args.no_images;
    config.dark_mode |= args.dark;

    let text = std::fs::read_to_string(&args.note)?;
    let mut doc = Document::new(text);
    let note = NoteContext::markdown(default_project_root(&args.note));

    let mut controller = RescanController::new();
    let summary = controller.scan(&mut doc, None, &note, &config);
    info!(
        "Styled {} constructs, {} code blocks, {} images pending",
        summary.style.matches, summary.code_blocks, summary.images_dispatched
    );

    let completions = controller.wait_for_pending(&mut doc, PENDING_TIMEOUT);
    if completions.images_dropped > 0 {
        info!("{} image previews could not be loaded", completions.images_dropped);
    }

    if args.roundtrip {
        print!("{}", RescanController::markdown_source(&doc));
    } else {
        print_summary(&doc);
    }
    Ok(())
}

fn print_summary(doc: &Document) {
    let mut counts: BTreeMap<AttributeKey, usize> = BTreeMap::new();
    for span in doc.spans() {
        *counts.entry(span.key).or_default() += 1;
    }
    println!("{} bytes, {} attachments", doc.len(), doc.attachments().len());
    for (key, count) in counts {
        println!("{:>16}  {} runs", format!("{:?}", key), count);
    }
    for span in doc.spans() {
        if span.key == AttributeKey::Link {
            let text = doc.substring(span.range.clone()).unwrap_or_default();
            println!("link {:?} -> {:?}", text, span.value.as_link());
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
