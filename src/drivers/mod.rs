// HeartTrack - ESP32 peripheral drivers

pub mod led;
pub mod max30105;
