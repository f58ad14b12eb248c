use log::debug;
use serde::Serialize;

use super::kinds::{EventKind, EventParams, InstantiationFlags};
use super::spawn::{ActorHandle, LevelHost, SpawnOutcome};
use super::{EventMap, MAIN_PLANE_Z};

/// Tick rate the wire-format delay byte (seconds) is converted with when a
/// generator rearms after spawning.
pub const TICKS_PER_SECOND: f32 = 60.0;

#[derive(Debug, Clone)]
pub(crate) struct GeneratorRecord {
    pub event_pos: usize,
    pub kind: EventKind,
    pub params: EventParams,
    pub delay: u8,
    pub time_left: f32,
    pub spawned: Option<ActorHandle>,
}

impl GeneratorRecord {
    pub fn new(
        event_pos: usize,
        kind: EventKind,
        params: EventParams,
        delay: u8,
        initially_charged: bool,
    ) -> Self {
        GeneratorRecord {
            event_pos,
            kind,
            params,
            delay,
            time_left: if initially_charged { delay as f32 } else { 0.0 },
            spawned: None,
        }
    }
}

/// Serializable view of one generator, for run reports and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorStatus {
    pub x: i32,
    pub y: i32,
    pub kind: u16,
    pub delay: u8,
    pub time_left: f32,
    pub spawned: bool,
}

impl EventMap {
    /// Advances every generator by one simulation tick. A generator only
    /// spawns while its anchor cell is active and its previous actor is gone;
    /// an inactive anchor keeps the countdown running so the generator can be
    /// ready the moment it comes back into range.
    pub fn process_generators(&mut self, host: &mut dyn LevelHost, time_mult: f32) {
        for index in 0..self.generators.len() {
            let (event_pos, kind, params, delay, time_left, spawned) = {
                let generator = &self.generators[index];
                (
                    generator.event_pos,
                    generator.kind,
                    generator.params,
                    generator.delay,
                    generator.time_left,
                    generator.spawned,
                )
            };

            if !self.layout[event_pos].active {
                // Recharging while outside player proximity.
                self.generators[index].time_left -= time_mult;
                continue;
            }

            if spawned.map_or(false, |actor| host.is_actor_live(actor)) {
                continue;
            }

            if time_left > 0.0 {
                self.generators[index].time_left -= time_mult;
                continue;
            }

            let x = (event_pos % self.width as usize) as i32;
            let y = (event_pos / self.width as usize) as i32;
            match host.spawn_event(
                InstantiationFlags::FROM_GENERATOR,
                kind,
                x,
                y,
                MAIN_PLANE_Z,
                &params,
            ) {
                SpawnOutcome::Spawned(actor) => {
                    host.add_actor(actor);
                    let generator = &mut self.generators[index];
                    generator.spawned = Some(actor);
                    generator.time_left = delay as f32 * TICKS_PER_SECOND;
                }
                SpawnOutcome::Pending(path) => {
                    debug!("generator at ({x}, {y}) waiting on {path}; retrying next tick");
                }
                SpawnOutcome::Failed => {
                    debug!("generator at ({x}, {y}) failed to spawn kind {kind}");
                }
            }
        }
    }

    pub fn generator_snapshot(&self) -> Vec<GeneratorStatus> {
        self.generators
            .iter()
            .map(|generator| GeneratorStatus {
                x: (generator.event_pos % self.width as usize) as i32,
                y: (generator.event_pos / self.width as usize) as i32,
                kind: generator.kind.0,
                delay: generator.delay,
                time_left: generator.time_left,
                spawned: generator.spawned.is_some(),
            })
            .collect()
    }
}
