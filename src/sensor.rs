use serde::Serialize;

use crate::atmos::SensorReading;

/// Identification registers of the sensor chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChipId {
    pub chip_id: u8,
    pub chip_version: u8,
}

/// Source of raw readings. The endpoint layer only ever talks to this, so
/// the hardware driver can be swapped for a mock in tests.
pub trait SensorReader: Send {
    fn read_all(&mut self) -> anyhow::Result<SensorReading>;

    fn read_id(&mut self) -> anyhow::Result<ChipId>;
}
