#[cfg(test)]
mod tests;

use anyhow::Context;
use log::{debug, info, warn};
use rppal::i2c::I2c;

use crate::atmos::SensorReading;
use crate::calib::{
    self, AdcData, Calibration, REG_ADC_VALUE, REG_ADC_VALUE_LEN, REG_CALIB_00, REG_CALIB_00_LEN,
    REG_CALIB_26, REG_CALIB_26_LEN,
};
use crate::sensor::{ChipId, SensorReader};

// BME280 I2C default slave address.
pub const ADDR_BME280: u16 = 0x76;
// value of REG_ID on a genuine BME280 (a BMP280 reports 0x58 and has no humidity)
const BME280_CHIP_ID: u8 = 0x60;

// BME280 register addresses.
// cf. https://trac.switch-science.com/wiki/BME280
const REG_ID: u8 = 0xD0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;

/// BME280 on the Raspberry Pi's primary I2C bus, running in normal mode.
pub struct Bme280 {
    i2c: I2c,
    calib: Calibration,
}

impl Bme280 {
    pub fn connect(address: u16) -> anyhow::Result<Self> {
        let mut i2c = I2c::new().context("can't open I2C bus")?;
        i2c.set_slave_address(address)
            .with_context(|| format!("can't address BME280 at {address:#04x}"))?;

        let osrs_t: u8 = 1; // Temperature oversampling x 1
        let osrs_p: u8 = 1; // Pressure oversampling x 1
        let osrs_h: u8 = 1; // Humidity oversampling x 1
        let mode: u8 = 3; // Normal mode
        let t_sb: u8 = 5; // Tstandby 1000ms
        let filter: u8 = 0; // Filter off
        let spi3w_en: u8 = 0; // 3-wire SPI Disable

        // ctrl_hum only takes effect after a write to ctrl_meas
        i2c.smbus_write_byte(REG_CTRL_HUM, osrs_h)?;
        i2c.smbus_write_byte(REG_CTRL_MEAS, (osrs_t << 5) | (osrs_p << 2) | mode)?;
        i2c.smbus_write_byte(REG_CONFIG, (t_sb << 5) | (filter << 2) | spi3w_en)?;

        let mut block_00 = [0u8; REG_CALIB_00_LEN];
        let mut block_26 = [0u8; REG_CALIB_26_LEN];
        i2c.write_read(&[REG_CALIB_00], &mut block_00)
            .context("can't read calibration block 0x88")?;
        i2c.write_read(&[REG_CALIB_26], &mut block_26)
            .context("can't read calibration block 0xE1")?;
        let calib = calib::parse_calibration(&block_00, &block_26)?;
        debug!("calibration: {calib:?}");

        let mut sensor = Self { i2c, calib };

        let id = sensor.read_id()?;
        if id.chip_id != BME280_CHIP_ID {
            warn!(
                "unexpected chip id {:#04x} at {address:#04x}, humidity may be bogus",
                id.chip_id
            );
        }
        info!(
            "BME280 at {address:#04x}: chip id {:#04x}, version {:#04x}",
            id.chip_id, id.chip_version
        );

        Ok(sensor)
    }
}

impl SensorReader for Bme280 {
    fn read_all(&mut self) -> anyhow::Result<SensorReading> {
        let mut burst = [0u8; REG_ADC_VALUE_LEN];
        self.i2c
            .write_read(&[REG_ADC_VALUE], &mut burst)
            .context("can't read ADC registers")?;
        let adc = calib::parse_adc(&burst)?;

        Ok(compensate(&self.calib, &adc))
    }

    fn read_id(&mut self) -> anyhow::Result<ChipId> {
        let mut id = [0u8; 2];
        self.i2c
            .write_read(&[REG_ID], &mut id)
            .context("can't read chip id")?;

        Ok(ChipId { chip_id: id[0], chip_version: id[1] })
    }
}

/// Floating point compensation from the datasheet, appendix 8.1.
pub fn compensate(calib: &Calibration, adc: &AdcData) -> SensorReading {
    let t_fine = fine_temperature(calib, adc.temperature);

    SensorReading {
        temperature_celsius: t_fine / 5120.0,
        pressure_hpa: compute_pressure(calib, adc.pressure, t_fine) / 100.0,
        relative_humidity_percent: compute_humidity(calib, adc.humidity, t_fine),
    }
}

fn fine_temperature(calib: &Calibration, raw_value: u32) -> f64 {
    let raw = f64::from(raw_value);
    let t1 = f64::from(calib.dig_t1);

    let v1 = (raw / 16384.0 - t1 / 1024.0) * f64::from(calib.dig_t2);
    let v2 = (raw / 131072.0 - t1 / 8192.0)
        * (raw / 131072.0 - t1 / 8192.0)
        * f64::from(calib.dig_t3);
    v1 + v2
}

// Pa
fn compute_pressure(calib: &Calibration, raw_value: u32, t_fine: f64) -> f64 {
    let [p2, p3, p4, p5, p6, p7, p8, p9] = calib.dig_p.map(f64::from);

    let mut v1 = t_fine / 2.0 - 64000.0;
    let mut v2 = v1 * v1 * p6 / 32768.0;
    v2 += v1 * p5 * 2.0;
    v2 = v2 / 4.0 + p4 * 65536.0;
    v1 = (p3 * v1 * v1 / 524288.0 + p2 * v1) / 524288.0;
    v1 = (1.0 + v1 / 32768.0) * f64::from(calib.dig_p1);
    if v1 == 0.0 {
        // avoid division by zero
        return 0.0;
    }

    let mut p = 1048576.0 - f64::from(raw_value);
    p = (p - v2 / 4096.0) * 6250.0 / v1;
    v1 = p9 * p * p / 2147483648.0;
    v2 = p * p8 / 32768.0;
    p + (v1 + v2 + p7) / 16.0
}

// %RH, clamped to 0..=100
fn compute_humidity(calib: &Calibration, raw_value: u32, t_fine: f64) -> f64 {
    let h1 = f64::from(calib.dig_h1);
    let h2 = f64::from(calib.dig_h2);
    let h3 = f64::from(calib.dig_h3);
    let h4 = f64::from(calib.dig_h4);
    let h5 = f64::from(calib.dig_h5);
    let h6 = f64::from(calib.dig_h6);

    let mut h = t_fine - 76800.0;
    h = (f64::from(raw_value) - (h4 * 64.0 + h5 / 16384.0 * h))
        * (h2 / 65536.0 * (1.0 + h6 / 67108864.0 * h * (1.0 + h3 / 67108864.0 * h)));
    h *= 1.0 - h1 * h / 524288.0;

    h.clamp(0.0, 100.0)
}
