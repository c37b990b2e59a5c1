//! Terminal rendering adapter.
//!
//! Draws `ControllerState` snapshots and translates key presses into
//! `UiCommand`s. Filtering and playback selection live in the controller;
//! the only state owned here is presentation state (search cursor, list
//! selection, country selector position).

mod app;

pub use app::run;
