#[cfg(test)]
mod tests;

use anyhow::anyhow;
use nom::{
    multi::fill,
    number::complete as number,
    IResult,
};

// BME280 register blocks as laid out in the datasheet
//  see: https://www.bosch-sensortec.com/media/boschsensortec/downloads/datasheets/bst-bme280-ds002.pdf
//  table 16 (compensation parameter storage) and 4.2.2 (burst read of data registers)
pub const REG_CALIB_00: u8 = 0x88;
pub const REG_CALIB_00_LEN: usize = 26;     // 0x88 - 0xA1
pub const REG_CALIB_26: u8 = 0xE1;
pub const REG_CALIB_26_LEN: usize = 7;      // 0xE1 - 0xE7
pub const REG_ADC_VALUE: u8 = 0xF7;
pub const REG_ADC_VALUE_LEN: usize = 8;     // 0xF7 - 0xFE

/// Factory trimming parameters burned into the chip.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,

    pub dig_p1: u16,
    pub dig_p: [i16; 8],    // dig_P2 .. dig_P9

    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

/// Uncompensated ADC output of one measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcData {
    pub pressure: u32,      // 20 bit
    pub temperature: u32,   // 20 bit
    pub humidity: u32,      // 16 bit
}

fn u8_parser(s: &[u8]) -> IResult<&[u8], u8> {
    number::u8(s)
}
fn i8_parser(s: &[u8]) -> IResult<&[u8], i8> {
    number::i8(s)
}
fn le_u16_parser(s: &[u8]) -> IResult<&[u8], u16> {
    number::le_u16(s)
}
fn le_i16_parser(s: &[u8]) -> IResult<&[u8], i16> {
    number::le_i16(s)
}
fn be_u16_parser(s: &[u8]) -> IResult<&[u8], u16> {
    number::be_u16(s)
}

fn calib_00_parser(s: &[u8]) -> IResult<&[u8], Calibration> {
    let mut c = Calibration::default();

    let (s, t1) = le_u16_parser(s)?;
    let (s, t2) = le_i16_parser(s)?;
    let (s, t3) = le_i16_parser(s)?;
    (c.dig_t1, c.dig_t2, c.dig_t3) = (t1, t2, t3);

    let (s, p1) = le_u16_parser(s)?;
    c.dig_p1 = p1;
    let (s, ()) = fill(le_i16_parser, &mut c.dig_p)(s)?;

    // 0xA0 is not used
    let (s, _) = u8_parser(s)?;
    let (s, h1) = u8_parser(s)?;
    c.dig_h1 = h1;

    Ok((s, c))
}

// dig_H4 and dig_H5 are 12 bit values sharing the nibbles of 0xE5
fn calib_26_parser(s: &[u8]) -> IResult<&[u8], (i16, u8, i16, i16, i8)> {
    let (s, h2) = le_i16_parser(s)?;
    let (s, h3) = u8_parser(s)?;
    let (s, e4) = i8_parser(s)?;
    let (s, e5) = u8_parser(s)?;
    let (s, e6) = i8_parser(s)?;
    let (s, h6) = i8_parser(s)?;

    let h4 = (i16::from(e4) << 4) | i16::from(e5 & 0x0F);
    let h5 = (i16::from(e6) << 4) | i16::from(e5 >> 4);

    Ok((s, (h2, h3, h4, h5, h6)))
}

fn adc_parser(s: &[u8]) -> IResult<&[u8], AdcData> {
    let (s, p) = twenty_bit_parser(s)?;
    let (s, t) = twenty_bit_parser(s)?;
    let (s, h) = be_u16_parser(s)?;

    Ok((s, AdcData { pressure: p, temperature: t, humidity: h.into() }))
}

// msb, lsb, then the top nibble of xlsb
fn twenty_bit_parser(s: &[u8]) -> IResult<&[u8], u32> {
    let (s, msb) = u8_parser(s)?;
    let (s, lsb) = u8_parser(s)?;
    let (s, xlsb) = u8_parser(s)?;

    Ok((s, (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xlsb) >> 4)))
}

/// Decodes the two calibration blocks read from `REG_CALIB_00` and `REG_CALIB_26`.
pub fn parse_calibration(block_00: &[u8], block_26: &[u8]) -> anyhow::Result<Calibration> {
    let (_, c) = calib_00_parser(block_00)
        .map_err(|e| anyhow!("malformed calibration block 0x88: {e:?}"))?;
    let (_, (h2, h3, h4, h5, h6)) = calib_26_parser(block_26)
        .map_err(|e| anyhow!("malformed calibration block 0xE1: {e:?}"))?;

    Ok(Calibration { dig_h2: h2, dig_h3: h3, dig_h4: h4, dig_h5: h5, dig_h6: h6, ..c })
}

/// Decodes a burst read starting at `REG_ADC_VALUE`.
pub fn parse_adc(input: &[u8]) -> anyhow::Result<AdcData> {
    let (_, d) = adc_parser(input)
        .map_err(|e| anyhow!("malformed ADC burst: {e:?}"))?;

    Ok(d)
}
