//! Client-side duel runtime consumed by the presentation layer

pub mod duel;

pub use duel::{DuelClient, DuelEvent, DuelMode, FrameOutput};
