//! Encoder operating points

use std::fmt;

use serde::{Deserialize, Serialize};

/// Video definition in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get the pixel count for this size
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for VideoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One operating point the encoder can run at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoConfiguration {
    /// Output definition
    pub size: VideoSize,
    /// Framerate in fps
    pub fps: f32,
    /// Bitrate in bits/s the encoder needs at this size and framerate.
    ///
    /// On the encoder's *current* configuration this is the output bitrate the
    /// encoder is targeting.
    pub required_bitrate: u32,
    /// Bitrate in bits/s above which this operating point gains nothing
    pub bitrate_limit: u32,
    /// Minimum number of cores needed to sustain this operating point
    #[serde(default = "default_min_cpu")]
    pub min_cpu: u32,
}

fn default_min_cpu() -> u32 {
    1
}

impl VideoConfiguration {
    pub fn new(size: VideoSize, fps: f32, required_bitrate: u32, bitrate_limit: u32) -> Self {
        Self {
            size,
            fps,
            required_bitrate,
            bitrate_limit,
            min_cpu: default_min_cpu(),
        }
    }

    /// Same operating point with a different minimum core count
    pub fn with_min_cpu(mut self, min_cpu: u32) -> Self {
        self.min_cpu = min_cpu;
        self
    }

    /// Whether a host with `cpu_count` cores can run this operating point
    pub fn fits_cpu(&self, cpu_count: u32) -> bool {
        self.min_cpu <= cpu_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_do_not_overflow() {
        let size = VideoSize::new(u32::MAX, 2);
        assert_eq!(size.pixels(), u64::from(u32::MAX) * 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(VideoSize::new(640, 480).to_string(), "640x480");
    }

    #[test]
    fn test_min_cpu_defaults_when_missing() {
        let conf: VideoConfiguration = toml::from_str(
            r#"
            fps = 15.0
            required_bitrate = 200000
            bitrate_limit = 250000
            size = { width = 320, height = 240 }
            "#,
        )
        .unwrap();
        assert_eq!(conf.min_cpu, 1);
        assert!(conf.fits_cpu(1));
        assert!(!conf.with_min_cpu(4).fits_cpu(2));
    }
}
