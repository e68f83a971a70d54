//! Audio capture plumbing around the estimator

pub mod adapter;
pub mod buffer;
pub mod session;

#[cfg(feature = "device")]
pub mod input;
#[cfg(feature = "device")]
pub mod live;

pub use adapter::{InterleavedF32, PcmI16, PcmSource, PlanarF32};
pub use buffer::SampleRingBuffer;
pub use session::{CaptureSession, FrequencySink, SessionConfig, SessionStats};

#[cfg(feature = "device")]
pub use input::{AudioDeviceInfo, AudioError, AudioInput};
#[cfg(feature = "device")]
pub use live::LiveCapture;
