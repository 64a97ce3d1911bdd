//! Capture capability probes

mod cpal_probe;

pub use cpal_probe::CpalDeviceProbe;
