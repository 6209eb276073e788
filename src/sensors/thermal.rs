// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Thermal sensors - thermistor read out by the serial sensor board

use super::convert::parse_decimal;
use super::error::{ConversionError, ReadError, SetupError, TransportError};
use super::{Measurement, SensorDescriptor, SensorDevice, SensorKind};
use crate::transport::LineSelector;

/// 103JT thermistor behind a signal-selected serial line.
///
/// The board answers the signal with the temperature as one ASCII line,
/// e.g. `23.5\r\n`.
#[derive(Debug)]
pub struct Thermistor {
    descriptor: SensorDescriptor,
    selector: LineSelector,
}

impl Thermistor {
    pub fn new(selector: LineSelector) -> Self {
        Self::with_model(selector, SensorKind::Thermistor.default_model())
    }

    pub fn with_model(selector: LineSelector, model_number: &str) -> Self {
        Self {
            descriptor: SensorDescriptor::new(SensorKind::Thermistor, model_number),
            selector,
        }
    }
}

impl SensorDevice for Thermistor {
    type Raw = String;

    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn location(&self) -> String {
        self.selector.location()
    }

    fn setup(&mut self) -> Result<(), SetupError> {
        self.selector.reset()?;
        Ok(())
    }

    fn sample(&mut self) -> Result<String, ReadError> {
        Ok(self.selector.request()?)
    }

    fn convert(&self, raw: String) -> Result<Measurement, ConversionError> {
        Ok(Measurement::Temperature {
            temperature_celsius: parse_decimal(&raw)?,
        })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.selector.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Event, MockLine};
    use crate::transport::SharedLine;
    use std::time::Duration;

    fn thermistor(mock: MockLine, signal: &str) -> Thermistor {
        let line = SharedLine::new(Box::new(mock), Duration::from_millis(100));
        Thermistor::new(LineSelector::new(line, signal))
    }

    #[test]
    fn test_setup_resets_line() {
        let mock = MockLine::new("ttyACM0");
        let recorder = mock.recorder();
        let mut t = thermistor(mock, "1");
        t.setup().unwrap();
        assert_eq!(recorder.events(), vec![Event::Reset]);
        assert_eq!(t.location(), "ttyACM0#1");
    }

    #[test]
    fn test_sample_and_convert() {
        let mock = MockLine::new("ttyACM0").with_replies(&[("1", "24.25")]);
        let mut t = thermistor(mock, "1");
        let raw = t.sample().unwrap();
        assert_eq!(
            t.convert(raw).unwrap(),
            Measurement::Temperature { temperature_celsius: 24.25 }
        );
    }

    #[test]
    fn test_garbled_line_is_conversion_error() {
        let mock = MockLine::new("ttyACM0").with_replies(&[("1", "2#.1")]);
        let mut t = thermistor(mock, "1");
        let raw = t.sample().unwrap();
        assert!(matches!(t.convert(raw), Err(ConversionError::Parse { .. })));
    }

    #[test]
    fn test_close_releases_line_once() {
        let mock = MockLine::new("ttyACM0");
        let recorder = mock.recorder();
        let mut t = thermistor(mock, "1");
        t.close().unwrap();
        assert_eq!(recorder.closes(), 1);
        assert!(matches!(t.close(), Err(TransportError::Closed)));
        assert!(matches!(t.sample(), Err(ReadError::Transport(TransportError::Closed))));
        assert_eq!(recorder.closes(), 1);
    }
}
