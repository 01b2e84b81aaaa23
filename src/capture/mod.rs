// Capture module - live disturbance recording
//
// Components, leaves first:
// 1. RingBuffer: pre-trigger window
// 2. BaselineEstimator: quiescent mean
// 3. TriggerDetector: Idle -> Armed -> Triggered -> Ended state machine
// 4. CaptureSession: read/timestamp/persist loop driving the above
//
// Sources, clocks and sinks are traits so a session runs identically against
// hardware, a replayed CSV, or a scripted sequence in tests.

pub mod baseline;
pub mod clock;
pub mod ring_buffer;
pub mod session;
pub mod source;
pub mod storage;
pub mod trigger;

pub use baseline::BaselineEstimator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use ring_buffer::RingBuffer;
pub use session::{CaptureReport, CaptureSession};
pub use source::{ReplaySource, SampleSource, ScriptedSource, SyntheticSource, SyntheticSpec};
pub use storage::{CsvSampleSink, MemorySampleSink, SampleSink, SinkWrite};
pub use trigger::{StopReason, Transition, TriggerDetector, TriggerSettings, TriggerState};
