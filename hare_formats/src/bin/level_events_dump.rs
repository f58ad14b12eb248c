use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hare_formats::events::open_event_layout;

#[derive(Parser, Debug)]
#[command(about = "Summarize a compressed level event layout", version)]
struct Args {
    /// Path to the deflate-compressed event layout file
    layout: PathBuf,

    /// Emit the decoded layout as pretty JSON instead of the summary table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let layout = open_event_layout(&args.layout)?;

    if args.json {
        let json = serde_json::to_string_pretty(&layout).context("serializing layout to JSON")?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "{}x{} cells in {}",
        layout.width,
        layout.height,
        args.layout.display()
    );

    let mut kind_counts: BTreeMap<u16, usize> = BTreeMap::new();
    let mut generators = 0usize;
    for cell in &layout.cells {
        if cell.kind == 0 && cell.flags == 0 {
            continue;
        }
        *kind_counts.entry(cell.kind).or_insert(0) += 1;
        if cell.is_generator() {
            generators += 1;
        }
    }

    for (kind, count) in &kind_counts {
        println!("kind {kind:>5}  x{count}");
    }
    println!("{generators} generator cells");
    Ok(())
}
