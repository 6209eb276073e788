// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Raw-to-engineering-unit conversions
//!
//! Everything here is pure so it can be tested without a transport.

use crc::{Crc, CRC_8_NRSC_5};

use super::error::ConversionError;

/// Sea-level reference pressure for altitude, hPa
pub const REFERENCE_PRESSURE_HPA: f64 = 1013.25;

/// Barometric formula exponent (1 / 5.25588)
pub const BAROMETRIC_EXPONENT: f64 = 0.190263;

/// Standard temperature lapse rate, K/m
const LAPSE_RATE: f64 = 0.0065;

const KELVIN_OFFSET: f64 = 273.15;

// Sensirion CRC-8: poly 0x31, init 0xFF, no reflection
const SENSIRION_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// LPS25H pressure from PRESS_OUT_XL, PRESS_OUT_L, PRESS_OUT_H
pub fn lps25h_pressure_hpa(raw: [u8; 3]) -> f64 {
    let counts = (raw[2] as u32) << 16 | (raw[1] as u32) << 8 | raw[0] as u32;
    counts as f64 / 4096.0
}

/// LPS25H temperature from TEMP_OUT_L, TEMP_OUT_H
pub fn lps25h_temperature_celsius(raw: [u8; 2]) -> f64 {
    let counts = (raw[1] as u16) << 8 | raw[0] as u16;
    42.5 + (counts as f64 - 65535.0) / 480.0
}

/// Altitude above the reference pressure level, metres.
///
/// Hypsometric form of the barometric formula using the measured air
/// temperature: `((P0 / P)^0.190263 - 1) * (T + 273.15) / 0.0065`.
///
/// This differs from the `((P / P0)^0.190263 - 1) * T / 0.0065` variant with
/// `T` in °C: that one is zero at 0 °C and negative above the reference
/// level, so its heights are not comparable with these.
pub fn altitude_meters(pressure_hpa: f64, temperature_celsius: f64) -> f64 {
    if pressure_hpa <= 0.0 {
        return 0.0;
    }
    let ratio = (REFERENCE_PRESSURE_HPA / pressure_hpa).powf(BAROMETRIC_EXPONENT);
    (ratio - 1.0) * (temperature_celsius + KELVIN_OFFSET) / LAPSE_RATE
}

/// SHT31 temperature from a big-endian 16-bit word, scaled over [-45, 130] °C
pub fn sht31_temperature_celsius(word: u16) -> f64 {
    -45.0 + 175.0 * word as f64 / 65535.0
}

/// SHT31 relative humidity from a big-endian 16-bit word, scaled over [0, 100] %
pub fn sht31_humidity_percent(word: u16) -> f64 {
    100.0 * word as f64 / 65535.0
}

/// Sensirion CRC-8 over one data word
pub fn sensirion_crc(bytes: [u8; 2]) -> u8 {
    SENSIRION_CRC.checksum(&bytes)
}

/// Validate an SHT31 `[msb, lsb, crc]` triple and return the word
pub fn sht31_checked_word(triple: [u8; 3]) -> Result<u16, ConversionError> {
    let computed = sensirion_crc([triple[0], triple[1]]);
    if computed != triple[2] {
        return Err(ConversionError::Checksum {
            computed,
            received: triple[2],
        });
    }
    Ok((triple[0] as u16) << 8 | triple[1] as u16)
}

/// Parse one ASCII decimal value as sent by the serial sensor board
pub fn parse_decimal(input: &str) -> Result<f64, ConversionError> {
    let trimmed = input.trim();
    trimmed.parse::<f64>().map_err(|_| ConversionError::Parse {
        input: trimmed.to_string(),
    })
}

/// Parse a comma separated line into exactly `N` values
pub fn parse_decimal_list<const N: usize>(input: &str) -> Result<[f64; N], ConversionError> {
    let parts: Vec<&str> = input.trim().split(',').collect();
    if parts.len() != N {
        return Err(ConversionError::FieldCount {
            input: input.trim().to_string(),
            expected: N,
        });
    }
    let mut values = [0.0; N];
    for (slot, part) in values.iter_mut().zip(parts) {
        *slot = parse_decimal(part)?;
    }
    Ok(values)
}
