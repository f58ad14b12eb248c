pub mod events;
pub mod host;
pub mod resources;

pub use events::{
    ActorHandle, Difficulty, EventKind, EventMap, EventParams, InstantiationFlags, LevelHost,
    PlayerKind, SpawnOutcome, WeatherKind,
};
pub use resources::{ResourceNotifier, ResourceSubscription};
