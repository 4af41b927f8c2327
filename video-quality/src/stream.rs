//! Encoder and capture collaborator
//!
//! The controller never owns the media pipeline. The host hands it a
//! [`VideoStream`] on every call and the controller reads capabilities and
//! pushes changes through it.

use crate::configuration::{VideoConfiguration, VideoSize};
use crate::error::ApplyError;

/// Host stream as seen by the quality controller
///
/// All calls are synchronous and made from the host's media loop.
pub trait VideoStream {
    /// Configurations the encoder supports, or `None` if the encoder cannot
    /// enumerate them. Without a list the controller does nothing.
    fn configuration_list(&self) -> Option<&[VideoConfiguration]>;

    /// Configuration the encoder is currently running
    fn current_configuration(&self) -> VideoConfiguration;

    /// Push a new fps/bitrate configuration to the encoder
    fn set_configuration(&mut self, configuration: &VideoConfiguration) -> Result<(), ApplyError>;

    /// Change the capture source framerate
    fn set_source_fps(&mut self, fps: f32) -> Result<(), ApplyError>;

    /// Record the framerate the stream is now configured for
    fn set_configured_fps(&mut self, fps: f32);

    /// Definition sent to the remote side
    fn set_output_size(&mut self, size: VideoSize);

    /// Definition of the local preview
    fn set_preview_size(&mut self, size: VideoSize);

    /// Framerate the capture pipeline must use after its next restart
    fn set_forced_fps(&mut self, fps: f32);

    /// Rebuild the capture pipeline with the sizes and framerate set above,
    /// keeping the current encoder bitrate
    fn restart_capture(&mut self) -> Result<(), ApplyError>;

    /// Number of cores available to the encoder
    fn cpu_count(&self) -> u32;

    /// Encoder name used in log messages
    fn encoder_name(&self) -> &str {
        "encoder"
    }
}
