use serde::Serialize;

use super::kinds::{EventKind, EventParams, InstantiationFlags, WeatherKind};

/// Generation-checked reference to an actor owned by the host. Copyable and
/// never dereferenced here; liveness is always re-validated through
/// [`LevelHost::is_actor_live`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActorHandle {
    pub index: u32,
    pub generation: u32,
}

/// Result of asking the host to instantiate an actor for an event cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(ActorHandle),
    /// Required content is still loading; carries the asset path the host is
    /// waiting on.
    Pending(String),
    Failed,
}

/// Spawn request parked until its asset path is reported resident. A cleared
/// path marks the entry retry-eligible on the next activation sweep.
#[derive(Debug, Clone)]
pub(crate) struct DeferredSpawn {
    pub path: Option<String>,
    pub x: i32,
    pub y: i32,
}

/// Everything the event layer needs from the surrounding level: actor
/// instantiation, the tile map, and ambient effects.
pub trait LevelHost {
    fn spawn_event(
        &mut self,
        flags: InstantiationFlags,
        kind: EventKind,
        x: i32,
        y: i32,
        z: f32,
        params: &EventParams,
    ) -> SpawnOutcome;

    fn add_actor(&mut self, actor: ActorHandle);

    fn is_actor_live(&self, actor: ActorHandle) -> bool;

    fn set_tile_event_flags(&mut self, x: i32, y: i32, kind: EventKind, params: &EventParams);

    fn is_tile_empty(&self, x: i32, y: i32) -> bool;

    fn apply_weather(&mut self, weather: WeatherKind, intensity: u16, outdoors: bool);

    /// Transient visual stand-in dropped where a spawn had to be deferred.
    fn spawn_placeholder(&mut self, x: i32, y: i32);

    fn ambient_light_default(&self) -> u16;
}
