pub mod events;

pub use events::{
    EventLayout, RawEventCell, encode_event_layout, open_event_layout, read_compressed_event_layout,
    read_event_layout, write_compressed_event_layout, write_event_layout,
};
