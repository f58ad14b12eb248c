use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use hare_engine::events::Difficulty;

/// Headless driver that loads a level event layout and simulates the
/// activation/generator loop over it.
#[derive(Parser, Debug)]
#[command(about = "Simulate the level event layer over a compressed layout", version)]
pub struct Args {
    /// Path to the deflate-compressed event layout file
    #[arg(long)]
    pub level: PathBuf,

    /// Difficulty the layout is filtered at (easy, normal, hard)
    #[arg(long, default_value = "normal")]
    pub difficulty: Difficulty,

    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 120)]
    pub ticks: u32,

    /// Camera tile X the activation sweep is centered on
    #[arg(long, default_value_t = 0)]
    pub camera_x: i32,

    /// Camera tile Y the activation sweep is centered on
    #[arg(long, default_value_t = 0)]
    pub camera_y: i32,

    /// Activation radius in tiles
    #[arg(long, default_value_t = 8)]
    pub radius: i32,

    /// Despawn simulated actors this many ticks after they spawn
    #[arg(long)]
    pub actor_ttl: Option<u32>,

    /// Simulated slow asset in the form KIND=PATH@TICK: spawns of event kind
    /// KIND stay pending until tick TICK (repeatable)
    #[arg(long = "slow-asset", value_name = "KIND=PATH@TICK")]
    pub slow_assets: Vec<String>,

    /// Path to write the run report JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlowAssetSpec {
    pub kind: u16,
    pub path: String,
    pub ready_at: u32,
}

pub fn parse_slow_asset(spec: &str) -> Result<SlowAssetSpec> {
    let Some((kind, rest)) = spec.split_once('=') else {
        bail!("slow asset {spec:?} is missing KIND=");
    };
    let Some((path, tick)) = rest.rsplit_once('@') else {
        bail!("slow asset {spec:?} is missing @TICK");
    };
    if path.is_empty() {
        bail!("slow asset {spec:?} has an empty path");
    }

    let kind = kind
        .trim()
        .parse()
        .with_context(|| format!("parsing event kind in slow asset {spec:?}"))?;
    let ready_at = tick
        .trim()
        .parse()
        .with_context(|| format!("parsing ready tick in slow asset {spec:?}"))?;

    Ok(SlowAssetSpec {
        kind,
        path: path.to_string(),
        ready_at,
    })
}
