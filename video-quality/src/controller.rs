//! Video quality controller
//!
//! Reacts to receiver bitrate ceilings: shrinks quality as soon as a lower
//! ceiling arrives, and only grows resolution once a probe armed by a higher
//! ceiling has gone [`ControllerConfig::probe_delay`] without being cancelled.

use std::cmp::Ordering;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::configuration::{VideoConfiguration, VideoSize};
use crate::error::ConfigError;
use crate::selection::{BestFit, ConfigurationSelector};
use crate::stream::VideoStream;

/// Threshold applied when shrinking or adjusting in place
const NO_THRESHOLD: f32 = 1.0;

/// Pending resolution growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Probe {
    /// No growth pending
    #[default]
    Idle,
    /// A higher ceiling was seen; growth is committed once the probe delay
    /// has elapsed since `since`
    Armed { since: Instant },
}

/// State tracked between feedback events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    /// Last ceiling received in bits/s, `None` until the first feedback
    pub last_ceiling: Option<u32>,
    /// Size committed by the last full reconfiguration
    pub last_applied_size: Option<VideoSize>,
    /// Growth probe
    pub probe: Probe,
}

/// What the controller pushed to the stream
#[derive(Debug, Clone, PartialEq)]
pub enum QualityChange {
    /// Definition switched and the capture pipeline restarted
    Definition { size: VideoSize, fps: f32 },
    /// Encoder bitrate (and possibly framerate) adjusted at the current size
    Bitrate { bitrate_limit: u32, fps: Option<f32> },
}

/// Video quality controller
///
/// One instance per outbound stream. Must be driven from a single thread: the
/// host calls [`on_ceiling_update`](Self::on_ceiling_update) whenever feedback
/// arrives and [`on_tick`](Self::on_tick) periodically, well below the probe
/// delay.
#[derive(Debug)]
pub struct QualityController<P = BestFit> {
    config: ControllerConfig,
    selector: P,
    state: ControllerState,
}

impl Default for QualityController {
    fn default() -> Self {
        Self {
            config: ControllerConfig::default(),
            selector: BestFit,
            state: ControllerState::default(),
        }
    }
}

impl QualityController {
    /// Create a controller using the [`BestFit`] selector
    ///
    /// Fails if the config does not pass [`ControllerConfig::validate`].
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        Self::with_selector(config, BestFit)
    }
}

impl<P: ConfigurationSelector> QualityController<P> {
    /// Create a controller with a custom configuration selector
    ///
    /// Fails if the config does not pass [`ControllerConfig::validate`].
    pub fn with_selector(config: ControllerConfig, selector: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            selector,
            state: ControllerState::default(),
        })
    }

    /// Handle a new bitrate ceiling (bits/s) received now
    pub fn on_ceiling_update<S: VideoStream + ?Sized>(
        &mut self,
        stream: &mut S,
        ceiling: u32,
    ) -> Option<QualityChange> {
        self.on_ceiling_update_at(stream, ceiling, Instant::now())
    }

    /// Handle a new bitrate ceiling (bits/s) received at `now`
    ///
    /// A lower ceiling cancels any pending probe and may reduce resolution
    /// immediately. A higher ceiling (re)arms the probe and only adjusts
    /// framerate and bitrate at the current resolution.
    pub fn on_ceiling_update_at<S: VideoStream + ?Sized>(
        &mut self,
        stream: &mut S,
        ceiling: u32,
        now: Instant,
    ) -> Option<QualityChange> {
        if self.state.last_ceiling.is_none() {
            let required = stream.current_configuration().required_bitrate;
            if ceiling < required {
                info!(
                    "First ceiling ({:.1} kbit/s) below required bitrate of current definition, reducing video quality",
                    kbits(ceiling)
                );
                let change = self.apply(stream, ceiling, NO_THRESHOLD, true);
                self.state.last_ceiling = Some(ceiling);
                return change;
            }
        }

        // No previous ceiling ranks below any ceiling.
        let direction = self
            .state
            .last_ceiling
            .map_or(Ordering::Greater, |last| ceiling.cmp(&last));

        let change = match direction {
            Ordering::Greater => {
                if matches!(self.state.probe, Probe::Idle) {
                    debug!("Ceiling rose to {:.1} kbit/s, arming growth probe", kbits(ceiling));
                }
                self.state.probe = Probe::Armed { since: now };
                self.apply(stream, ceiling, NO_THRESHOLD, false)
            }
            Ordering::Less => {
                self.state.probe = Probe::Idle;
                info!(
                    "Congestion detected ({:.1} kbit/s), reducing video quality",
                    kbits(ceiling)
                );
                self.apply(stream, ceiling, NO_THRESHOLD, true)
            }
            Ordering::Equal => None,
        };

        self.state.last_ceiling = Some(ceiling);
        change
    }

    /// Check the growth probe against the current time
    pub fn process_timer<S: VideoStream + ?Sized>(&mut self, stream: &mut S) -> Option<QualityChange> {
        self.on_tick(stream, Instant::now())
    }

    /// Check the growth probe at `now`
    ///
    /// Once the probe has stayed armed for the probe delay, re-evaluates the
    /// last ceiling with the growth threshold applied and allows a resolution
    /// increase. The probe is disarmed afterwards.
    pub fn on_tick<S: VideoStream + ?Sized>(
        &mut self,
        stream: &mut S,
        now: Instant,
    ) -> Option<QualityChange> {
        let Probe::Armed { since } = self.state.probe else {
            return None;
        };

        let delay = self.config.probe_delay();
        if now.saturating_duration_since(since) < delay {
            return None;
        }

        let change = match self.state.last_ceiling {
            Some(ceiling) => {
                info!(
                    "No further ceiling ({:.1} kbit/s) received after {} seconds, increasing video quality",
                    kbits(ceiling),
                    delay.as_secs()
                );
                self.apply(stream, ceiling, self.config.growth_threshold, true)
            }
            None => None,
        };

        self.state.probe = Probe::Idle;
        change
    }

    /// Pick and push the best configuration for `budget`
    ///
    /// With `resolution_eligible`, the budget divided by `threshold` may select
    /// a new definition. Otherwise, or when the definition stays, framerate and
    /// bitrate limit are adjusted at the current size for the full budget.
    fn apply<S: VideoStream + ?Sized>(
        &mut self,
        stream: &mut S,
        budget: u32,
        threshold: f32,
        resolution_eligible: bool,
    ) -> Option<QualityChange> {
        let list = stream.configuration_list()?;
        let mut current = stream.current_configuration();
        let cpu_count = stream.cpu_count();

        if resolution_eligible {
            // budget >= required * threshold  <=>  budget / threshold >= required
            let adjusted = (f64::from(budget) / f64::from(threshold)).floor() as u32;
            let best = self.selector.best_for_bitrate(list, adjusted, cpu_count);

            if let Some(best) = best {
                if self.state.last_applied_size != Some(best.size)
                    && best.size.pixels() != current.size.pixels()
                {
                    self.change_definition(stream, &best);
                    return Some(QualityChange::Definition {
                        size: best.size,
                        fps: best.fps,
                    });
                }
            }
        }

        let target = self
            .selector
            .best_for_size_and_bitrate(list, current.size, budget, cpu_count)?;

        let mut new_fps = None;
        if target.fps != current.fps {
            info!("Bitrate update will change fps from {} to {}", current.fps, target.fps);
            current.fps = target.fps;
            if let Err(e) = stream.set_source_fps(target.fps) {
                warn!("Failed to set source fps to {}: {}", target.fps, e);
            }
            stream.set_configured_fps(target.fps);
            new_fps = Some(target.fps);
        }

        let bitrate_limit = budget.min(target.bitrate_limit);
        debug!("Changing video encoder's output bitrate to {}", bitrate_limit);
        current.required_bitrate = bitrate_limit;

        if let Err(e) = stream.set_configuration(&current) {
            warn!(
                "Failed to apply fps and bitrate constraint to {}: {}",
                stream.encoder_name(),
                e
            );
        }

        Some(QualityChange::Bitrate {
            bitrate_limit,
            fps: new_fps,
        })
    }

    fn change_definition<S: VideoStream + ?Sized>(&mut self, stream: &mut S, best: &VideoConfiguration) {
        info!(
            "Changing video definition to {} at {} fps",
            best.size, best.fps
        );

        stream.set_output_size(best.size);
        stream.set_preview_size(best.size);
        stream.set_forced_fps(best.fps);
        if let Err(e) = stream.restart_capture() {
            warn!("Failed to restart capture at {}: {}", best.size, e);
        }

        self.state.last_applied_size = Some(best.size);
    }

    /// Return to the state of a freshly created controller
    ///
    /// Call this when the stream restarts so the next ceiling is treated as
    /// the first one.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }

    /// Get the controller state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Get the last ceiling received, if any
    pub fn last_ceiling(&self) -> Option<u32> {
        self.state.last_ceiling
    }

    /// Get the size committed by the last full reconfiguration
    pub fn last_applied_size(&self) -> Option<VideoSize> {
        self.state.last_applied_size
    }

    /// Whether a growth probe is armed
    pub fn probe_pending(&self) -> bool {
        matches!(self.state.probe, Probe::Armed { .. })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

fn kbits(bitrate: u32) -> f64 {
    f64::from(bitrate) * 1e-3
}
