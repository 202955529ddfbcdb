
use anyhow::bail;
use serde::Serialize;

/***
 * Atmos
 *
 *  Derived meteorological quantities computed from one raw BME280 reading.
 *  Everything in here is a closed-form formula: no I/O, no state kept
 *  between calls. Implausible input (pressure <= 0, humidity <= 0, ...)
 *  is not guarded against and turns into NaN or infinity; `try_derive`
 *  is the checked entry point the endpoint layer uses.
 */

const SEA_LEVEL_PRESSURE: f64 = 1013.25; // hPa
const ZERO_CELSIUS: f64 = 273.15; // K

// Arden Buck constant pairs (b, c) for the Magnus formula
//  cf. https://en.wikipedia.org/wiki/Dew_point#Calculating_the_dew_point
const BUCK_POSITIVE: (f64, f64) = (17.368, 238.88);
const BUCK_NEGATIVE: (f64, f64) = (17.966, 247.15);

// Rothfusz regression, degrees Fahrenheit
//  cf. http://en.wikipedia.org/wiki/Heat_index
const ROTHFUSZ: [f64; 9] = [
    -42.379,
    2.04901523,
    10.14333127,
    -0.22475541,
    -0.00683783,
    -0.05481717,
    0.00122874,
    0.00085282,
    -0.00000199,
];

/// One raw reading from the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SensorReading {
    #[serde(rename = "temperature")]
    pub temperature_celsius: f64,
    #[serde(rename = "pressure")]
    pub pressure_hpa: f64,
    #[serde(rename = "humidity")]
    pub relative_humidity_percent: f64,
}

/// Quantities derived from a [`SensorReading`]. Field names on the wire
/// keep the historical `aprox_altitude` spelling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DerivedMetrics {
    #[serde(rename = "aprox_altitude")]
    pub approx_altitude_m: f64,
    #[serde(rename = "precipitable_water")]
    pub precipitable_water_cm: f64,
    #[serde(rename = "dew_point")]
    pub dew_point_c: f64,
    #[serde(rename = "frost_point")]
    pub frost_point_c: f64,
    #[serde(rename = "cloud_base")]
    pub cloud_base_m: f64,
    pub humidity_index: f64,
    #[serde(rename = "heat_index")]
    pub heat_index_c: f64,
}

impl DerivedMetrics {
    fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("aprox_altitude", self.approx_altitude_m),
            ("precipitable_water", self.precipitable_water_cm),
            ("dew_point", self.dew_point_c),
            ("frost_point", self.frost_point_c),
            ("cloud_base", self.cloud_base_m),
            ("humidity_index", self.humidity_index),
            ("heat_index", self.heat_index_c),
        ]
    }
}

pub fn derive(reading: &SensorReading) -> DerivedMetrics {
    let temp_c = reading.temperature_celsius;
    let rh = reading.relative_humidity_percent;

    let dew_point_c = dew_point(temp_c, rh);

    DerivedMetrics {
        approx_altitude_m: altitude(temp_c, reading.pressure_hpa),
        precipitable_water_cm: precipitable_water(temp_c, rh),
        dew_point_c,
        frost_point_c: frost_point(temp_c, dew_point_c),
        cloud_base_m: cloud_base(temp_c, dew_point_c),
        humidity_index: humidity_index(temp_c, rh),
        heat_index_c: heat_index(temp_c, rh, dew_point_c),
    }
}

/// Like [`derive`], but fails when any derived quantity is NaN or infinite.
pub fn try_derive(reading: &SensorReading) -> anyhow::Result<DerivedMetrics> {
    let metrics = derive(reading);
    for (name, value) in metrics.fields() {
        if !value.is_finite() {
            bail!("{name} is not a finite number ({value}) for {reading:?}");
        }
    }

    Ok(metrics)
}

// Hypsometric formula, metres
//  cf. https://keisan.casio.com/has10/SpecExec.cgi?id=system/2006/1224585971
fn altitude(temp_c: f64, pressure_hpa: f64) -> f64 {
    let temp_kelvin = temp_c + ZERO_CELSIUS;
    ((SEA_LEVEL_PRESSURE / pressure_hpa).powf(1.0 / 5257.0) - 1.0) * temp_kelvin / 0.0065
}

// Keogh and Blakers, centimetres
//  cf. https://pvlib-python.readthedocs.io/en/stable/generated/pvlib.atmosphere.gueymard94_pw.html
fn precipitable_water(temp_c: f64, rh: f64) -> f64 {
    let t = temp_c + ZERO_CELSIUS;
    let theta = t / ZERO_CELSIUS;

    let vapor_density = 216.7 * rh / (100.0 * t)
        * (22.330 - 49.140 * (100.0 / t) - 10.922 * (100.0 / t).powi(2) - 0.39015 * t / 100.0)
            .exp();

    0.1 * (0.4976 + 1.5265 * theta + (13.6897 * theta - 14.9188 * theta.powi(3)).exp())
        * vapor_density
}

fn buck_constants(temp_c: f64) -> (f64, f64) {
    if temp_c > 0.0 {
        BUCK_POSITIVE
    } else {
        BUCK_NEGATIVE
    }
}

fn dew_point(temp_c: f64, rh: f64) -> f64 {
    let (b, c) = buck_constants(temp_c);
    let magnus = b * temp_c / (c + temp_c) + (rh / 100.0).ln();
    c * magnus / (b - magnus)
}

//  cf. https://gist.github.com/sourceperl/45587ea99ff123745428
fn frost_point(temp_c: f64, dew_point_c: f64) -> f64 {
    let temp_kelvin = temp_c + ZERO_CELSIUS;
    let dew_point_k = dew_point_c + ZERO_CELSIUS;
    let frost_point_k = dew_point_k - temp_kelvin
        + 2671.02 / (2954.61 / temp_kelvin + 2.193665 * temp_kelvin.ln() - 13.3448);
    frost_point_k - ZERO_CELSIUS
}

// FAA rule of thumb, metres
fn cloud_base(temp_c: f64, dew_point_c: f64) -> f64 {
    (temp_c - dew_point_c) / 2.5 * 1000.0
}

// Canadian humidex
fn humidity_index(temp_c: f64, rh: f64) -> f64 {
    let saturation_pressure = 6.112 * 10f64.powf(7.5 * temp_c / (237.7 + temp_c)) * rh / 100.0;
    temp_c + 0.555 * (saturation_pressure - 10.0)
}

// NWS heat index, only defined for T >= 26.7C, RH >= 40% and dew point >= 12C
fn heat_index(temp_c: f64, rh: f64, dew_point_c: f64) -> f64 {
    if temp_c < 26.7 || rh < 40.0 || dew_point_c < 12.0 {
        return temp_c;
    }

    let t = temp_c * 1.8 + 32.0;
    let r = rh;
    let [c1, c2, c3, c4, c5, c6, c7, c8, c9] = ROTHFUSZ;

    let fahrenheit = c1
        + c2 * t
        + c3 * r
        + c4 * t * r
        + c5 * t.powi(2)
        + c6 * r.powi(2)
        + c7 * t.powi(2) * r
        + c8 * t * r.powi(2)
        + c9 * t.powi(2) * r.powi(2);

    (fahrenheit - 32.0) / 1.8
}
