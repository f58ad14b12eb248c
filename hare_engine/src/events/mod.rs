mod activation;
mod decode;
mod generators;
mod kinds;
mod spawn;

pub use generators::{GeneratorStatus, TICKS_PER_SECOND};
pub use kinds::{
    Difficulty, EVENT_PARAM_COUNT, EventKind, EventParams, InstantiationFlags, PlayerKind,
    WeatherKind,
};
pub use spawn::{ActorHandle, LevelHost, SpawnOutcome};

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;

use crate::resources::{ResourceNotifier, ResourceSubscription};
use generators::GeneratorRecord;
use spawn::DeferredSpawn;

pub const TILE_SIZE: i32 = 32;

/// Z plane actors spawned by the event layer are placed on.
pub const MAIN_PLANE_Z: f32 = 500.0;

/// Returned by registry lookups that have nothing registered under the id.
pub const ABSENT_POSITION: Vec2 = Vec2::new(-1.0, -1.0);

static NO_PARAMS: EventParams = [0; EVENT_PARAM_COUNT];

#[derive(Debug, Clone, Copy)]
struct EventCell {
    kind: EventKind,
    flags: InstantiationFlags,
    params: EventParams,
    active: bool,
}

impl Default for EventCell {
    fn default() -> Self {
        EventCell {
            kind: EventKind::EMPTY,
            flags: InstantiationFlags::NONE,
            params: NO_PARAMS,
            active: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventMapError {
    #[error("event map cannot be sized {width}x{height}")]
    InvalidSize { width: i32, height: i32 },
    #[error("layout is {got_width}x{got_height} but the event map was sized {want_width}x{want_height}")]
    LayoutMismatch {
        got_width: i32,
        got_height: i32,
        want_width: i32,
        want_height: i32,
    },
    #[error("layout cell table holds {got} cells, expected {want}")]
    CellCountMismatch { got: usize, want: usize },
}

/// Per-tile event state for one loaded level: the fixed-size cell grid, the
/// warp/spawn registries, the generator table, and the deferred-spawn queue.
/// Construction subscribes to resource-ready notifications; dropping the map
/// unsubscribes.
pub struct EventMap {
    width: i32,
    height: i32,
    layout: Vec<EventCell>,
    warp_targets: BTreeMap<u16, Vec<Vec2>>,
    spawn_positions: BTreeMap<PlayerKind, Vec<Vec2>>,
    generators: Vec<GeneratorRecord>,
    deferred: Arc<Mutex<Vec<DeferredSpawn>>>,
    _resource_subscription: ResourceSubscription,
}

impl EventMap {
    pub fn new(
        notifier: &ResourceNotifier,
        width: i32,
        height: i32,
    ) -> Result<EventMap, EventMapError> {
        if width <= 0 || height <= 0 {
            return Err(EventMapError::InvalidSize { width, height });
        }

        let deferred: Arc<Mutex<Vec<DeferredSpawn>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::clone(&deferred);
        let subscription = notifier.subscribe(move |path| {
            let mut queue = queue.lock();
            for entry in queue.iter_mut() {
                if entry.path.as_deref() == Some(path) {
                    entry.path = None;
                }
            }
        });

        Ok(EventMap {
            width,
            height,
            layout: vec![EventCell::default(); width as usize * height as usize],
            warp_targets: BTreeMap::new(),
            spawn_positions: BTreeMap::new(),
            generators: Vec::new(),
            deferred,
            _resource_subscription: subscription,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((x + y * self.width) as usize)
    }

    pub fn has_event(&self, x: i32, y: i32) -> bool {
        self.cell_index(x, y)
            .map_or(false, |index| self.layout[index].kind != EventKind::EMPTY)
    }

    pub fn is_active(&self, x: i32, y: i32) -> bool {
        self.cell_index(x, y)
            .map_or(false, |index| self.layout[index].active)
    }

    /// Kind and parameters at a tile position. Below the bottom of the grid
    /// this reports [`EventKind::LETHAL_BOUNDARY`] so falling out of a level
    /// is fatal; every other out-of-bounds query reads as empty.
    pub fn event_at(&self, x: i32, y: i32) -> (EventKind, &EventParams) {
        if y > self.height {
            return (EventKind::LETHAL_BOUNDARY, &NO_PARAMS);
        }
        match self.cell_index(x, y) {
            Some(index) if self.layout[index].kind != EventKind::EMPTY => {
                let cell = &self.layout[index];
                (cell.kind, &cell.params)
            }
            _ => (EventKind::EMPTY, &NO_PARAMS),
        }
    }

    pub fn event_at_pixel(&self, px: f32, py: f32) -> (EventKind, &EventParams) {
        self.event_at(px as i32 / TILE_SIZE, py as i32 / TILE_SIZE)
    }

    /// Writes a cell in place; out-of-bounds writes are dropped so malformed
    /// layouts cannot index outside the grid.
    pub fn store_event(
        &mut self,
        x: i32,
        y: i32,
        kind: EventKind,
        flags: InstantiationFlags,
        params: &[u16],
    ) {
        let Some(index) = self.cell_index(x, y) else {
            return;
        };
        let mut cell = EventCell {
            kind,
            flags,
            params: NO_PARAMS,
            active: false,
        };
        let count = params.len().min(EVENT_PARAM_COUNT);
        cell.params[..count].copy_from_slice(&params[..count]);
        self.layout[index] = cell;
    }

    pub fn warp_target(&self, id: u16, rng: &mut impl Rng) -> Vec2 {
        match self.warp_targets.get(&id) {
            Some(targets) if !targets.is_empty() => targets[rng.gen_range(0..targets.len())],
            _ => ABSENT_POSITION,
        }
    }

    pub fn spawn_position(&self, player: PlayerKind, rng: &mut impl Rng) -> Vec2 {
        match self.spawn_positions.get(&player) {
            Some(targets) if !targets.is_empty() => targets[rng.gen_range(0..targets.len())],
            _ => ABSENT_POSITION,
        }
    }

    fn add_warp_target(&mut self, id: u16, x: i32, y: i32) {
        let position = Vec2::new((x * TILE_SIZE + 16) as f32, (y * TILE_SIZE + 12) as f32);
        self.warp_targets.entry(id).or_default().push(position);
    }

    fn add_spawn_position(&mut self, player: PlayerKind, x: i32, y: i32) {
        let position = Vec2::new((x * TILE_SIZE + 16) as f32, (y * TILE_SIZE + 8) as f32);
        self.spawn_positions.entry(player).or_default().push(position);
    }

    /// Warp id under a warp-origin cell at a pixel position, or -1.
    pub fn warp_at(&self, px: f32, py: f32) -> i32 {
        let (kind, params) = self.event_at_pixel(px, py);
        if kind == EventKind::WARP_ORIGIN {
            params[0] as i32
        } else {
            -1
        }
    }

    pub fn is_hurting(&self, host: &dyn LevelHost, px: f32, py: f32) -> bool {
        let tx = px as i32 / TILE_SIZE;
        let ty = py as i32 / TILE_SIZE;
        if self.event_at(tx, ty).0 != EventKind::HURT {
            return false;
        }
        !host.is_tile_empty(tx, ty)
    }

    /// 2 for a horizontal pole modifier, 1 for a vertical one, 0 otherwise.
    pub fn pole_at(&self, px: f32, py: f32) -> i32 {
        match self.event_at_pixel(px, py).0 {
            EventKind::H_POLE => 2,
            EventKind::V_POLE => 1,
            _ => 0,
        }
    }

    pub fn deactivate(&mut self, x: i32, y: i32) {
        if let Some(index) = self.cell_index(x, y) {
            if self.layout[index].kind != EventKind::EMPTY {
                self.layout[index].active = false;
            }
        }
    }

    pub fn deactivate_all(&mut self) {
        for cell in &mut self.layout {
            cell.active = false;
        }
    }

    /// The anchored actor was deactivated rather than destroyed; zero the
    /// generator's timer so it can respawn as soon as its anchor reactivates.
    pub fn reset_generator(&mut self, x: i32, y: i32) {
        let Some(index) = self.cell_index(x, y) else {
            return;
        };
        let cell = &self.layout[index];
        if cell.kind != EventKind::GENERATOR {
            return;
        }
        let generator_index = cell.params[0] as usize;
        if let Some(generator) = self.generators.get_mut(generator_index) {
            generator.time_left = 0.0;
        }
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    /// Number of spawn requests currently parked for retry.
    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().len()
    }
}
