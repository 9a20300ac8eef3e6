//! Room and participant lifecycle

pub mod registry;

pub use registry::{JoinError, SessionRegistry, ROOM_CAPACITY};
