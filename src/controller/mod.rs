//! Reconciliation controllers

mod mode_switch;

pub use mode_switch::{ModeSwitchConfig, ModeSwitchController};
