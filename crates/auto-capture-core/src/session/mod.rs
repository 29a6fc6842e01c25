mod controller;
mod log;
#[allow(clippy::module_inception)]
mod session;
mod settings;

pub use {
    controller::{CycleAction, CycleReport, SessionController},
    log::SessionLog,
    session::{Session, SessionState, StopReason},
    settings::{ControllerSettings, DeviceOverrides},
};
