use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::events::{
    ActorHandle, EventKind, EventParams, InstantiationFlags, LevelHost, SpawnOutcome, WeatherKind,
};

/// In-memory level host for the simulation driver and tests. Actors live in a
/// generation-checked slab, assets can be scripted to load late, and every
/// collaborator call is recorded.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    slots: Vec<ActorSlot>,
    free: Vec<usize>,
    tick: u64,
    actor_ttl: Option<u32>,
    ambient_light: u16,
    slow_assets: BTreeMap<u16, SlowAsset>,
    solid_tiles: BTreeSet<(i32, i32)>,
    pub spawn_log: Vec<SpawnRecord>,
    pub placeholder_log: Vec<(i32, i32)>,
    pub weather_log: Vec<WeatherRecord>,
    pub tile_flag_log: Vec<TileFlagRecord>,
}

#[derive(Debug, Clone)]
struct ActorSlot {
    generation: u32,
    alive: bool,
    kind: EventKind,
    expires_at: Option<u64>,
}

#[derive(Debug, Clone)]
struct SlowAsset {
    path: String,
    resident: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnRecord {
    pub kind: u16,
    pub flags: u8,
    pub x: i32,
    pub y: i32,
    pub generator: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    pub weather: u16,
    pub intensity: u16,
    pub outdoors: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TileFlagRecord {
    pub x: i32,
    pub y: i32,
    pub kind: u16,
}

impl HeadlessHost {
    pub fn new() -> Self {
        HeadlessHost {
            ambient_light: 255,
            ..HeadlessHost::default()
        }
    }

    pub fn with_ambient_light(mut self, value: u16) -> Self {
        self.ambient_light = value;
        self
    }

    /// Spawned actors despawn this many ticks after creation.
    pub fn with_actor_ttl(mut self, ticks: u32) -> Self {
        self.actor_ttl = Some(ticks);
        self
    }

    /// Spawns of `kind` answer Pending with `path` until it is marked
    /// resident.
    pub fn require_asset(&mut self, kind: u16, path: impl Into<String>) {
        self.slow_assets.insert(
            kind,
            SlowAsset {
                path: path.into(),
                resident: false,
            },
        );
    }

    pub fn mark_resident(&mut self, path: &str) {
        for asset in self.slow_assets.values_mut() {
            if asset.path == path {
                asset.resident = true;
            }
        }
    }

    pub fn mark_solid(&mut self, x: i32, y: i32) {
        self.solid_tiles.insert((x, y));
    }

    /// Advances the host clock and expires actors that outlived their TTL.
    pub fn begin_tick(&mut self) {
        self.tick += 1;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.alive && slot.expires_at.map_or(false, |at| at <= self.tick) {
                slot.alive = false;
                self.free.push(index);
            }
        }
    }

    pub fn despawn(&mut self, actor: ActorHandle) -> bool {
        match self.slots.get_mut(actor.index as usize) {
            Some(slot) if slot.alive && slot.generation == actor.generation => {
                slot.alive = false;
                self.free.push(actor.index as usize);
                true
            }
            _ => false,
        }
    }

    pub fn live_actors(&self) -> Vec<ActorHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| ActorHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn live_actor_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.alive).count()
    }

    pub fn spawned_kind_counts(&self) -> BTreeMap<u16, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.spawn_log {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn live_kind_counts(&self) -> BTreeMap<u16, usize> {
        let mut counts = BTreeMap::new();
        for slot in self.slots.iter().filter(|slot| slot.alive) {
            *counts.entry(slot.kind.0).or_insert(0) += 1;
        }
        counts
    }
}

impl LevelHost for HeadlessHost {
    fn spawn_event(
        &mut self,
        flags: InstantiationFlags,
        kind: EventKind,
        x: i32,
        y: i32,
        _z: f32,
        _params: &EventParams,
    ) -> SpawnOutcome {
        if let Some(asset) = self.slow_assets.get(&kind.0) {
            if !asset.resident {
                return SpawnOutcome::Pending(asset.path.clone());
            }
        }

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.alive = true;
                slot.kind = kind;
                slot.expires_at = self.actor_ttl.map(|ttl| self.tick + u64::from(ttl));
                index
            }
            None => {
                self.slots.push(ActorSlot {
                    generation: 0,
                    alive: true,
                    kind,
                    expires_at: self.actor_ttl.map(|ttl| self.tick + u64::from(ttl)),
                });
                self.slots.len() - 1
            }
        };

        self.spawn_log.push(SpawnRecord {
            kind: kind.0,
            flags: flags.0,
            x,
            y,
            generator: flags.contains(InstantiationFlags::FROM_GENERATOR),
        });

        SpawnOutcome::Spawned(ActorHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    fn add_actor(&mut self, _actor: ActorHandle) {
        // Spawned actors already live in the slab.
    }

    fn is_actor_live(&self, actor: ActorHandle) -> bool {
        self.slots
            .get(actor.index as usize)
            .map_or(false, |slot| {
                slot.alive && slot.generation == actor.generation
            })
    }

    fn set_tile_event_flags(&mut self, x: i32, y: i32, kind: EventKind, _params: &EventParams) {
        self.tile_flag_log.push(TileFlagRecord {
            x,
            y,
            kind: kind.0,
        });
    }

    fn is_tile_empty(&self, x: i32, y: i32) -> bool {
        !self.solid_tiles.contains(&(x, y))
    }

    fn apply_weather(&mut self, weather: WeatherKind, intensity: u16, outdoors: bool) {
        self.weather_log.push(WeatherRecord {
            weather: weather.0,
            intensity,
            outdoors,
        });
    }

    fn spawn_placeholder(&mut self, x: i32, y: i32) {
        self.placeholder_log.push((x, y));
    }

    fn ambient_light_default(&self) -> u16 {
        self.ambient_light
    }
}
