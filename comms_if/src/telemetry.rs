//! # Simulator Telemetry Interface
//!
//! The simulator sends a telemetry message on every tick containing the vehicle's current state
//! and a base64 encoded camera image, and expects a control message in response.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize, Deserializer};
use thiserror::Error;

use crate::eqpt::cam::Frame;
use crate::sign::SignVector;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry sent by the simulator every tick.
///
/// The simulator encodes numbers as strings, so the numeric fields accept either.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TelemetryMsg {
    /// Throttle currently applied
    #[serde(deserialize_with = "lenient_f64")]
    pub throttle: f64,

    /// Steering angle currently applied
    #[serde(deserialize_with = "lenient_f64")]
    pub steering_angle: f64,

    /// Current vehicle speed
    #[serde(deserialize_with = "lenient_f64")]
    pub speed: f64,

    /// Base64 encoded PNG or JPEG camera image
    pub image: String,

    /// Classifier output for this tick, if one was recorded alongside the telemetry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signs: Option<SignVector>,
}

/// Control demands sent back to the simulator.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct ControlMsg {
    pub steering_angle: f64,
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Could not parse the telemetry message: {0}")]
    ParseError(serde_json::Error),

    #[error("Could not serialize the message: {0}")]
    SerializeError(serde_json::Error),

    #[error("The image is not valid base64: {0}")]
    Base64Error(base64::DecodeError),

    #[error("Could not decode the image: {0}")]
    ImageError(image::ImageError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(f64),
    Str(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetryMsg {
    /// Parse a telemetry message from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        serde_json::from_str(json).map_err(TelemetryError::ParseError)
    }

    /// Build a message around an encoded image.
    pub fn with_image_bytes(speed: f64, encoded_image: &[u8]) -> Self {
        Self {
            throttle: 0.0,
            steering_angle: 0.0,
            speed,
            image: base64::encode(encoded_image),
            signs: None,
        }
    }

    /// Decode the camera image into an RGB frame.
    pub fn decode_frame(&self) -> Result<Frame, TelemetryError> {
        let bytes = base64::decode(&self.image).map_err(TelemetryError::Base64Error)?;

        image::load_from_memory(&bytes)
            .map(|i| i.to_rgb8())
            .map_err(TelemetryError::ImageError)
    }
}

impl ControlMsg {
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        serde_json::to_string(self).map_err(TelemetryError::SerializeError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sign::SignSlot;
    use image::{DynamicImage, ImageOutputFormat, Rgb};

    fn encoded_png() -> Vec<u8> {
        let mut frame = Frame::new(8, 4);
        frame.put_pixel(3, 2, Rgb([255, 128, 0]));

        let mut data = Vec::new();
        DynamicImage::ImageRgb8(frame)
            .write_to(&mut data, ImageOutputFormat::Png)
            .unwrap();
        data
    }

    #[test]
    fn test_string_fields() {
        let json = format!(
            r#"{{"throttle": "0.5", "steering_angle": "-2.5", "speed": 12.0, "image": "{}"}}"#,
            base64::encode(&encoded_png())
        );

        let msg = TelemetryMsg::from_json(&json).unwrap();
        assert_eq!(msg.throttle, 0.5);
        assert_eq!(msg.steering_angle, -2.5);
        assert_eq!(msg.speed, 12.0);
        assert!(msg.signs.is_none());

        let frame = msg.decode_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 4));
        assert_eq!(frame.get_pixel(3, 2), &Rgb([255, 128, 0]));
    }

    #[test]
    fn test_signs_field() {
        let mut msg = TelemetryMsg::with_image_bytes(3.0, &encoded_png());
        msg.signs = Some(SignVector::with_active(&[SignSlot::Stop]));

        let json = serde_json::to_string(&msg).unwrap();
        let back = TelemetryMsg::from_json(&json).unwrap();
        assert_eq!(back.signs, msg.signs);

        let bad = json.replace("[0,0,0,0,0,0,1]", "[0,0,1]");
        assert!(matches!(
            TelemetryMsg::from_json(&bad),
            Err(TelemetryError::ParseError(_))
        ));
    }

    #[test]
    fn test_bad_image() {
        let mut msg = TelemetryMsg::with_image_bytes(0.0, b"not an image");
        assert!(matches!(msg.decode_frame(), Err(TelemetryError::ImageError(_))));

        msg.image = "%%%".into();
        assert!(matches!(msg.decode_frame(), Err(TelemetryError::Base64Error(_))));
    }

    #[test]
    fn test_control_json() {
        let msg = ControlMsg { steering_angle: -0.3, throttle: 0.5 };
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"steering_angle":-0.3,"throttle":0.5}"#
        );
    }
}
