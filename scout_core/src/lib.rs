// scout_core/src/lib.rs

// Pure mission logic. Hardware, time, and services come in through the
// traits in `abstractions`; nothing here spawns a runtime or touches a device.
pub mod abstractions;
pub mod config;
pub mod error;
pub mod mapping;
pub mod messages;
pub mod mission;
pub mod mock;
pub mod navigation;
pub mod perception;
pub mod planning;
pub mod prelude;
pub mod search;
pub mod types;
pub mod utils;
pub mod worker;
