extern crate hex_literal;

#[cfg(test)]
mod calib_tests {
    use crate::calib::{
        parse_adc, parse_calibration, REG_ADC_VALUE_LEN, REG_CALIB_00_LEN, REG_CALIB_26_LEN,
    };
    use hex_literal::hex;

    // trimming values from the datasheet's worked example (section 8.2)
    const CALIB_00: [u8; REG_CALIB_00_LEN] = hex!(
        "706b 4367 18fc 7d8e 43d6 d00b 270b 8c00"
        "f9ff 8c3c f8c6 7017 004b"
    );
    const CALIB_26: [u8; REG_CALIB_26_LEN] = hex!("6a01 0013 2903 1e");
    const ADC: [u8; REG_ADC_VALUE_LEN] = hex!("655a c07e ed00 7530");

    #[test]
    fn decodes_temperature_and_pressure_words() {
        let c = parse_calibration(&CALIB_00, &CALIB_26).unwrap();

        assert_eq!(c.dig_t1, 27504);
        assert_eq!(c.dig_t2, 26435);
        assert_eq!(c.dig_t3, -1000);

        assert_eq!(c.dig_p1, 36477);
        assert_eq!(c.dig_p, [-10685, 3024, 2855, 140, -7, 15500, -14600, 6000]);
    }

    #[test]
    fn decodes_humidity_words() {
        let c = parse_calibration(&CALIB_00, &CALIB_26).unwrap();

        assert_eq!(c.dig_h1, 75);
        assert_eq!(c.dig_h2, 362);
        assert_eq!(c.dig_h3, 0);
        assert_eq!(c.dig_h4, 313);
        assert_eq!(c.dig_h5, 50);
        assert_eq!(c.dig_h6, 30);
    }

    #[test]
    fn sign_extends_split_humidity_words() {
        let mut block = CALIB_26;
        // dig_H4 = -20, dig_H5 = -3
        block[3..6].copy_from_slice(&hex!("fedc ff"));

        let c = parse_calibration(&CALIB_00, &block).unwrap();

        assert_eq!(c.dig_h4, -20);
        assert_eq!(c.dig_h5, -3);
    }

    #[test]
    fn decodes_adc_burst() {
        let d = parse_adc(&ADC).unwrap();

        assert_eq!(d.pressure, 415148);
        assert_eq!(d.temperature, 519888);
        assert_eq!(d.humidity, 30000);
    }

    #[test]
    fn short_calibration_block_is_an_error() {
        assert!(parse_calibration(&CALIB_00[..20], &CALIB_26).is_err());
        assert!(parse_calibration(&CALIB_00, &CALIB_26[..6]).is_err());
    }

    #[test]
    fn short_adc_burst_is_an_error() {
        let err = parse_adc(&ADC[..7]).unwrap_err();

        assert!(err.to_string().contains("ADC"));
    }
}
