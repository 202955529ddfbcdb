#[cfg(test)]
mod compensation_tests {
    use crate::bme280::compensate;
    use crate::calib::{AdcData, Calibration};

    // datasheet worked example, plus plausible humidity trimming
    fn datasheet_calibration() -> Calibration {
        Calibration {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p: [-10685, 3024, 2855, 140, -7, 15500, -14600, 6000],
            dig_h1: 75,
            dig_h2: 362,
            dig_h3: 0,
            dig_h4: 313,
            dig_h5: 50,
            dig_h6: 30,
        }
    }

    fn adc(humidity: u32) -> AdcData {
        AdcData { pressure: 415148, temperature: 519888, humidity }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn matches_datasheet_example() {
        let r = compensate(&datasheet_calibration(), &adc(30000));

        // 25.08 degC and 100653.27 Pa in the datasheet
        assert_close(r.temperature_celsius, 25.08247793081682);
        assert_close(r.pressure_hpa, 1006.5326677582515);
        assert_close(r.relative_humidity_percent, 55.00071477602678);
    }

    #[test]
    fn humidity_is_clamped() {
        let c = datasheet_calibration();

        assert_eq!(compensate(&c, &adc(0)).relative_humidity_percent, 0.0);
        assert_eq!(compensate(&c, &adc(60000)).relative_humidity_percent, 100.0);
    }

    #[test]
    fn zero_pressure_trimming_yields_zero_pressure() {
        let c = Calibration { dig_p1: 0, ..datasheet_calibration() };

        assert_eq!(compensate(&c, &adc(30000)).pressure_hpa, 0.0);
    }
}
