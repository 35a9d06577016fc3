//! Event detection: the fixed-duration clip recorder and the capture
//! state machine that drives it from amplitude polling.

pub mod machine;
pub mod recorder;

pub use machine::{CaptureMachine, DetectorHandle, DetectorState, DetectorStatus};
pub use recorder::{Clip, ClipAdvisory, ClipRecorder};
