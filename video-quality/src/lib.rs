//! Congestion-driven video quality control
//!
//! This crate adjusts an outbound video stream's resolution, framerate and
//! encoder bitrate from receiver bitrate ceilings (TMMBR-style feedback).
//! Shrinking happens as soon as a lower ceiling arrives; resolution growth is
//! deferred behind a probe that must survive a quiet period first.
//!
//! # Components
//!
//! - [`config`]: Controller policy (probe delay, growth threshold)
//! - [`configuration`]: Encoder operating points
//! - [`presets`]: Reference configuration table for software encoders
//! - [`selection`]: Best-configuration-for-bitrate strategy
//! - [`stream`]: The encoder/capture collaborator the controller drives
//! - [`controller`]: Feedback handler, probe timer and configuration apply

mod config;
mod configuration;
mod controller;
mod error;
mod presets;
mod selection;
mod stream;

pub use config::ControllerConfig;
pub use configuration::{VideoConfiguration, VideoSize};
pub use controller::{ControllerState, Probe, QualityChange, QualityController};
pub use error::{ApplyError, ConfigError};
pub use presets::reference_configurations;
pub use selection::{BestFit, ConfigurationSelector};
pub use stream::VideoStream;
