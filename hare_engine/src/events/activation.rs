use log::debug;

use super::kinds::{EventKind, EventParams, InstantiationFlags, WeatherKind};
use super::spawn::{DeferredSpawn, LevelHost, SpawnOutcome};
use super::{EventMap, MAIN_PLANE_Z};

#[derive(Clone, Copy)]
enum RetryDisposition {
    Defer,
    Drop,
}

impl EventMap {
    /// Marks every event cell within `tile_distance` of `(tx, ty)` active and
    /// issues a spawn request for each cell activating for the first time.
    /// Re-running the sweep over an already-active region spawns nothing.
    /// Ends by draining the current deferred-spawn backlog once.
    pub fn activate_events(&mut self, host: &mut dyn LevelHost, tx: i32, ty: i32, tile_distance: i32) {
        let x1 = (tx - tile_distance).max(0);
        let x2 = (tx + tile_distance).min(self.width - 1);
        let y1 = (ty - tile_distance).max(0);
        let y2 = (ty + tile_distance).min(self.height - 1);

        for x in x1..=x2 {
            for y in y1..=y2 {
                let index = (x + y * self.width) as usize;
                let cell = &mut self.layout[index];
                if cell.active || cell.kind == EventKind::EMPTY {
                    continue;
                }
                cell.active = true;

                let (kind, flags, params) = (cell.kind, cell.flags, cell.params);
                self.dispatch_cell(host, kind, flags, x, y, &params, RetryDisposition::Defer);
            }
        }

        self.drain_deferred(host);
    }

    fn dispatch_cell(
        &self,
        host: &mut dyn LevelHost,
        kind: EventKind,
        flags: InstantiationFlags,
        x: i32,
        y: i32,
        params: &EventParams,
        retry: RetryDisposition,
    ) {
        if kind == EventKind::WEATHER {
            // Weather never goes through the spawn interface.
            host.apply_weather(WeatherKind(params[0]), params[1], params[2] != 0);
            return;
        }
        if kind == EventKind::GENERATOR {
            // Generators are driven exclusively by process_generators.
            return;
        }

        match host.spawn_event(
            InstantiationFlags::FROM_EVENT_MAP | flags,
            kind,
            x,
            y,
            MAIN_PLANE_Z,
            params,
        ) {
            SpawnOutcome::Spawned(actor) => host.add_actor(actor),
            SpawnOutcome::Pending(path) => match retry {
                RetryDisposition::Defer => {
                    debug!("spawn of kind {kind} at ({x}, {y}) deferred until {path} is resident");
                    self.deferred.lock().push(DeferredSpawn {
                        path: Some(path),
                        x,
                        y,
                    });
                    host.spawn_placeholder(x, y);
                }
                RetryDisposition::Drop => {
                    debug!("retried spawn at ({x}, {y}) still waiting on {path}; dropping");
                }
            },
            SpawnOutcome::Failed => {
                debug!("spawn of kind {kind} at ({x}, {y}) failed; dropping");
            }
        }
    }

    fn drain_deferred(&self, host: &mut dyn LevelHost) {
        let ready: Vec<(i32, i32)> = {
            let mut queue = self.deferred.lock();
            let mut ready = Vec::new();
            let mut index = 0;
            while index < queue.len() {
                if queue[index].path.is_none() {
                    let entry = queue.swap_remove(index);
                    ready.push((entry.x, entry.y));
                } else {
                    index += 1;
                }
            }
            ready
        };

        for (x, y) in ready {
            let Some(index) = self.cell_index(x, y) else {
                continue;
            };
            let cell = &self.layout[index];
            let (kind, flags, params) = (cell.kind, cell.flags, cell.params);
            // Retried entries are gone from the queue whatever happens next;
            // the cell is immutable, so a second failure would repeat forever.
            self.dispatch_cell(host, kind, flags, x, y, &params, RetryDisposition::Drop);
        }
    }
}
