// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Acceleration sensors

use super::convert::parse_decimal_list;
use super::error::{ConversionError, ReadError, SetupError, TransportError};
use super::{Measurement, SensorDescriptor, SensorDevice, SensorKind};
use crate::transport::LineSelector;

/// KX224 triple-axis accelerometer behind the serial sensor board.
///
/// The board replies `x,y,z` in m/s² on one line.
#[derive(Debug)]
pub struct Accelerometer {
    descriptor: SensorDescriptor,
    selector: LineSelector,
}

impl Accelerometer {
    pub fn new(selector: LineSelector) -> Self {
        Self::with_model(selector, SensorKind::Accelerometer.default_model())
    }

    pub fn with_model(selector: LineSelector, model_number: &str) -> Self {
        Self {
            descriptor: SensorDescriptor::new(SensorKind::Accelerometer, model_number),
            selector,
        }
    }
}

impl SensorDevice for Accelerometer {
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
        let [x_mps2, y_mps2, z_mps2] = parse_decimal_list::<3>(&raw)?;
        Ok(Measurement::Acceleration { x_mps2, y_mps2, z_mps2 })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.selector.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockLine;
    use crate::transport::SharedLine;
    use std::time::Duration;

    #[test]
    fn test_three_axis_line() {
        let mock = MockLine::new("ttyACM0").with_replies(&[("5", "0.02,-0.11,9.79")]);
        let line = SharedLine::new(Box::new(mock), Duration::from_millis(100));
        let mut acc = Accelerometer::new(LineSelector::new(line, "5"));
        acc.setup().unwrap();
        let raw = acc.sample().unwrap();
        assert_eq!(
            acc.convert(raw).unwrap(),
            Measurement::Acceleration { x_mps2: 0.02, y_mps2: -0.11, z_mps2: 9.79 }
        );
    }

    #[test]
    fn test_missing_axis_rejected() {
        let line = SharedLine::new(Box::new(MockLine::new("ttyACM0")), Duration::from_millis(100));
        let acc = Accelerometer::new(LineSelector::new(line, "5"));
        assert!(matches!(
            acc.convert("0.1,0.2".to_string()),
            Err(ConversionError::FieldCount { expected: 3, .. })
        ));
    }
}
