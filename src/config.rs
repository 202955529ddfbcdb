
use std::net::SocketAddr;

use anyhow::Context;

use crate::bme280::ADDR_BME280;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    pub i2c_address: u16,
}

// usage: bme280-atmos [listen-addr] [i2c-address]
//  the 'first' arg is index 1 -- AFTER the command name; extra args are ignored
pub fn parse_config(args: &[String]) -> anyhow::Result<Config> {
    let listen = args.get(1).map(String::as_str).unwrap_or(DEFAULT_LISTEN);
    let listen = listen
        .parse::<SocketAddr>()
        .with_context(|| format!("bad listen address '{listen}'"))?;

    let i2c_address = match args.get(2) {
        Some(a) => parse_i2c_address(a)?,
        None => ADDR_BME280,
    };

    Ok(Config { listen, i2c_address })
}

// 7-bit address, as hex (0x77) or decimal (119)
fn parse_i2c_address(s: &str) -> anyhow::Result<u16> {
    let address = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .with_context(|| format!("bad I2C address '{s}'"))?;

    anyhow::ensure!(address <= 0x7F, "I2C address {address:#x} is out of the 7-bit range");
    Ok(address)
}
