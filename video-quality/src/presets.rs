//! Reference configuration table
//!
//! Operating points for a software encoder, from highest to lowest quality.
//! Bitrates are in bits/s. Hosts whose encoder enumerates its own capabilities
//! should pass that list instead.

use crate::configuration::{VideoConfiguration, VideoSize};

pub const UXGA: VideoSize = VideoSize::new(1600, 1200);
pub const HD_720P: VideoSize = VideoSize::new(1280, 720);
pub const XGA: VideoSize = VideoSize::new(1024, 768);
pub const SVGA: VideoSize = VideoSize::new(800, 600);
pub const VGA: VideoSize = VideoSize::new(640, 480);
pub const QVGA: VideoSize = VideoSize::new(320, 240);
pub const QCIF: VideoSize = VideoSize::new(176, 144);

/// Build the reference table
///
/// Entries needing several cores come first; the last entry has no bitrate
/// requirement so a selection never comes back empty.
pub fn reference_configurations() -> Vec<VideoConfiguration> {
    vec![
        VideoConfiguration::new(UXGA, 25.0, 1_536_000, 2_560_000).with_min_cpu(4),
        VideoConfiguration::new(HD_720P, 30.0, 1_024_000, 1_536_000).with_min_cpu(4),
        VideoConfiguration::new(XGA, 30.0, 750_000, 1_024_000).with_min_cpu(2),
        VideoConfiguration::new(SVGA, 30.0, 500_000, 750_000).with_min_cpu(2),
        VideoConfiguration::new(VGA, 30.0, 300_000, 500_000),
        VideoConfiguration::new(VGA, 15.0, 200_000, 300_000),
        VideoConfiguration::new(QVGA, 18.0, 100_000, 200_000),
        VideoConfiguration::new(QCIF, 12.0, 64_000, 100_000),
        VideoConfiguration::new(QCIF, 10.0, 0, 64_000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_descend() {
        let table = reference_configurations();
        for pair in table.windows(2) {
            assert!(pair[0].required_bitrate > pair[1].required_bitrate);
        }
    }

    #[test]
    fn test_limits_cover_requirements() {
        for conf in reference_configurations() {
            assert!(conf.bitrate_limit > conf.required_bitrate, "{:?}", conf);
        }
    }

    #[test]
    fn test_last_entry_always_qualifies() {
        let table = reference_configurations();
        let last = table.last().unwrap();
        assert_eq!(last.required_bitrate, 0);
        assert!(last.fits_cpu(1));
    }
}
