//! Best-configuration selection
//!
//! Maps a bitrate budget onto one entry of the encoder's configuration list.
//! The controller only depends on the [`ConfigurationSelector`] trait so hosts
//! with their own capability model can plug it in.

use std::cmp::Ordering;

use crate::configuration::{VideoConfiguration, VideoSize};

/// Strategy picking an operating point for a bitrate budget
///
/// Implementations must be deterministic and monotonic in `bitrate`: a larger
/// budget never yields a strictly worse configuration. Both methods return
/// `None` only for an empty list.
pub trait ConfigurationSelector {
    /// Best configuration across all sizes for `bitrate`
    fn best_for_bitrate(
        &self,
        list: &[VideoConfiguration],
        bitrate: u32,
        cpu_count: u32,
    ) -> Option<VideoConfiguration>;

    /// Best configuration at exactly `size` for `bitrate`
    fn best_for_size_and_bitrate(
        &self,
        list: &[VideoConfiguration],
        size: VideoSize,
        bitrate: u32,
        cpu_count: u32,
    ) -> Option<VideoConfiguration>;
}

/// Default selector
///
/// Among configurations whose requirement fits the budget, picks the largest
/// definition, then the highest framerate. When nothing fits, the one with the
/// lowest requirement is used. Configurations needing more cores than
/// available are skipped unless every entry does, in which case only the
/// least demanding ones are considered.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

fn quality_order(a: &VideoConfiguration, b: &VideoConfiguration) -> Ordering {
    a.size
        .pixels()
        .cmp(&b.size.pixels())
        .then_with(|| a.fps.total_cmp(&b.fps))
        .then_with(|| a.required_bitrate.cmp(&b.required_bitrate))
}

fn cost_order(a: &VideoConfiguration, b: &VideoConfiguration) -> Ordering {
    a.required_bitrate
        .cmp(&b.required_bitrate)
        .then_with(|| quality_order(a, b))
}

fn feasible<'a>(
    list: &[&'a VideoConfiguration],
    cpu_count: u32,
) -> Vec<&'a VideoConfiguration> {
    let fitting: Vec<_> = list.iter().copied().filter(|c| c.fits_cpu(cpu_count)).collect();
    if !fitting.is_empty() {
        return fitting;
    }

    match list.iter().map(|c| c.min_cpu).min() {
        Some(least) => list.iter().copied().filter(|c| c.min_cpu == least).collect(),
        None => Vec::new(),
    }
}

fn pick(candidates: &[&VideoConfiguration], bitrate: u32) -> Option<VideoConfiguration> {
    candidates
        .iter()
        .copied()
        .filter(|c| c.required_bitrate <= bitrate)
        .max_by(|a, b| quality_order(a, b))
        .or_else(|| {
            candidates
                .iter()
                .copied()
                .min_by(|a, b| cost_order(a, b))
        })
        .copied()
}

impl ConfigurationSelector for BestFit {
    fn best_for_bitrate(
        &self,
        list: &[VideoConfiguration],
        bitrate: u32,
        cpu_count: u32,
    ) -> Option<VideoConfiguration> {
        let all: Vec<_> = list.iter().collect();
        pick(&feasible(&all, cpu_count), bitrate)
    }

    fn best_for_size_and_bitrate(
        &self,
        list: &[VideoConfiguration],
        size: VideoSize,
        bitrate: u32,
        cpu_count: u32,
    ) -> Option<VideoConfiguration> {
        let same_size: Vec<_> = list.iter().filter(|c| c.size == size).collect();
        if same_size.is_empty() {
            // Unknown size: borrow the framerate and limit of the best overall
            // entry but keep the definition unchanged.
            return self
                .best_for_bitrate(list, bitrate, cpu_count)
                .map(|conf| VideoConfiguration { size, ..conf });
        }
        pick(&feasible(&same_size, cpu_count), bitrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{reference_configurations, HD_720P, QCIF, QVGA, VGA};

    fn two_point_list() -> Vec<VideoConfiguration> {
        vec![
            VideoConfiguration::new(VideoSize::new(320, 240), 15.0, 200_000, 250_000),
            VideoConfiguration::new(VideoSize::new(640, 480), 30.0, 600_000, 700_000),
        ]
    }

    #[test]
    fn test_picks_highest_that_fits() {
        let best = BestFit.best_for_bitrate(&two_point_list(), 650_000, 1).unwrap();
        assert_eq!(best.size, VideoSize::new(640, 480));

        let best = BestFit.best_for_bitrate(&two_point_list(), 599_999, 1).unwrap();
        assert_eq!(best.size, VideoSize::new(320, 240));
    }

    #[test]
    fn test_falls_back_to_cheapest() {
        let best = BestFit.best_for_bitrate(&two_point_list(), 150_000, 1).unwrap();
        assert_eq!(best.size, VideoSize::new(320, 240));
        assert_eq!(best.required_bitrate, 200_000);
    }

    #[test]
    fn test_prefers_larger_definition_over_cost() {
        let list = vec![
            VideoConfiguration::new(VideoSize::new(640, 480), 15.0, 350_000, 450_000),
            VideoConfiguration::new(VideoSize::new(320, 240), 30.0, 400_000, 500_000),
        ];

        let best = BestFit.best_for_bitrate(&list, 500_000, 1).unwrap();
        assert_eq!((best.size, best.fps), (VideoSize::new(640, 480), 15.0));

        let only_cheap = BestFit.best_for_bitrate(&list, 380_000, 1).unwrap();
        assert_eq!(only_cheap.size, VideoSize::new(640, 480));

        let starved = BestFit.best_for_bitrate(&list, 100_000, 1).unwrap();
        assert_eq!(starved.required_bitrate, 350_000);
    }

    #[test]
    fn test_quality_monotonic_in_budget() {
        let list = vec![
            VideoConfiguration::new(VideoSize::new(640, 480), 15.0, 350_000, 450_000),
            VideoConfiguration::new(VideoSize::new(320, 240), 30.0, 400_000, 500_000),
            VideoConfiguration::new(VideoSize::new(320, 240), 15.0, 150_000, 250_000),
            VideoConfiguration::new(VideoSize::new(1280, 720), 30.0, 900_000, 1_200_000),
        ];
        let mut previous: Option<VideoConfiguration> = None;
        for budget in (0..1_500_000).step_by(10_000) {
            let chosen = BestFit.best_for_bitrate(&list, budget, 1).unwrap();
            if let Some(prev) = previous {
                assert_ne!(
                    quality_order(&chosen, &prev),
                    Ordering::Less,
                    "budget {} regressed from {:?} to {:?}",
                    budget,
                    prev,
                    chosen
                );
            }
            previous = Some(chosen);
        }
    }

    #[test]
    fn test_list_order_does_not_matter() {
        let mut reversed = two_point_list();
        reversed.reverse();
        let a = BestFit.best_for_bitrate(&two_point_list(), 700_000, 1);
        let b = BestFit.best_for_bitrate(&reversed, 700_000, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cpu_count_limits_choice() {
        let table = reference_configurations();

        let single = BestFit.best_for_bitrate(&table, 5_000_000, 1).unwrap();
        assert_eq!(single.size, VGA);
        assert_eq!(single.fps, 30.0);

        let quad = BestFit.best_for_bitrate(&table, 1_100_000, 4).unwrap();
        assert_eq!(quad.size, HD_720P);
    }

    #[test]
    fn test_least_demanding_used_when_nothing_fits_cpu() {
        let list = vec![
            VideoConfiguration::new(HD_720P, 30.0, 1_000_000, 1_500_000).with_min_cpu(8),
            VideoConfiguration::new(VGA, 30.0, 300_000, 500_000).with_min_cpu(4),
        ];
        let best = BestFit.best_for_bitrate(&list, 2_000_000, 1).unwrap();
        assert_eq!(best.size, VGA);
    }

    #[test]
    fn test_requirement_monotonic_in_budget() {
        let table = reference_configurations();
        for cpu_count in [1, 2, 4] {
            let mut previous = 0;
            for budget in (0..3_000_000).step_by(25_000) {
                let chosen = BestFit.best_for_bitrate(&table, budget, cpu_count).unwrap();
                assert!(
                    chosen.required_bitrate >= previous,
                    "budget {} with {} cpus regressed to {:?}",
                    budget,
                    cpu_count,
                    chosen
                );
                previous = chosen.required_bitrate;
            }
        }
    }

    #[test]
    fn test_size_restricted_selection() {
        let table = reference_configurations();

        let high = BestFit.best_for_size_and_bitrate(&table, VGA, 400_000, 1).unwrap();
        assert_eq!((high.size, high.fps), (VGA, 30.0));

        let low = BestFit.best_for_size_and_bitrate(&table, VGA, 250_000, 1).unwrap();
        assert_eq!((low.size, low.fps), (VGA, 15.0));

        let starved = BestFit.best_for_size_and_bitrate(&table, VGA, 10_000, 1).unwrap();
        assert_eq!((starved.size, starved.fps), (VGA, 15.0));

        let qcif = BestFit.best_for_size_and_bitrate(&table, QCIF, 70_000, 1).unwrap();
        assert_eq!(qcif.fps, 12.0);
    }

    #[test]
    fn test_unknown_size_keeps_definition() {
        let odd = VideoSize::new(500, 500);
        let conf = BestFit
            .best_for_size_and_bitrate(&reference_configurations(), odd, 150_000, 1)
            .unwrap();
        assert_eq!(conf.size, odd);
        assert_eq!(conf.bitrate_limit, 200_000);
        assert_ne!(conf.size, QVGA);
    }

    #[test]
    fn test_empty_list() {
        assert!(BestFit.best_for_bitrate(&[], 1_000_000, 4).is_none());
        assert!(BestFit.best_for_size_and_bitrate(&[], VGA, 1_000_000, 4).is_none());
    }
}
