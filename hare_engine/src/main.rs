use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use hare_engine::events::{EventMap, GeneratorStatus};
use hare_engine::host::{HeadlessHost, WeatherRecord};
use hare_engine::resources::ResourceNotifier;

mod cli;

use cli::{Args, SlowAssetSpec};

#[derive(Serialize)]
struct RunReport {
    level: String,
    ticks: u32,
    spawned: BTreeMap<u16, usize>,
    placeholders: usize,
    weather: Vec<WeatherRecord>,
    generators: Vec<GeneratorStatus>,
    deferred_remaining: usize,
    live_actors: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut pending_assets: Vec<SlowAssetSpec> = args
        .slow_assets
        .iter()
        .map(|spec| cli::parse_slow_asset(spec))
        .collect::<Result<_>>()?;

    let layout = hare_formats::events::open_event_layout(&args.level)?;
    let notifier = ResourceNotifier::new();
    let mut map = EventMap::new(&notifier, layout.width, layout.height)
        .context("sizing the event map from the layout header")?;

    let mut host = HeadlessHost::new();
    if let Some(ttl) = args.actor_ttl {
        host = host.with_actor_ttl(ttl);
    }
    for asset in &pending_assets {
        host.require_asset(asset.kind, asset.path.clone());
    }

    map.read_events(&layout, args.difficulty, &mut host)
        .context("populating the event map")?;
    println!(
        "Loaded {}x{} layout with {} generators",
        map.width(),
        map.height(),
        map.generator_count()
    );

    for tick in 0..args.ticks {
        host.begin_tick();
        map.activate_events(&mut host, args.camera_x, args.camera_y, args.radius);
        map.process_generators(&mut host, 1.0);

        pending_assets.retain(|asset| {
            if asset.ready_at <= tick {
                host.mark_resident(&asset.path);
                notifier.notify_ready(&asset.path);
                false
            } else {
                true
            }
        });
    }

    let report = RunReport {
        level: args.level.display().to_string(),
        ticks: args.ticks,
        spawned: host.spawned_kind_counts(),
        placeholders: host.placeholder_log.len(),
        weather: host.weather_log.clone(),
        generators: map.generator_snapshot(),
        deferred_remaining: map.deferred_len(),
        live_actors: host.live_actor_count(),
    };

    if let Some(path) = args.report_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&report).context("serializing run report to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing run report to {}", path.display()))?;
        println!("Saved run report to {}", path.display());
    }

    println!(
        "{} actors live after {} ticks ({} spawn requests, {} retries pending)",
        report.live_actors,
        report.ticks,
        host.spawn_log.len(),
        report.deferred_remaining
    );

    Ok(())
}
