pub mod capture;
pub mod codec;
pub mod frame;
pub mod live;
pub mod playback;
pub mod resample;

// Re-export commonly used types for convenience
pub use capture::{
    CaptureConfig, CaptureError, CapturePipeline, CaptureResult, CaptureStats, InputDevice,
    ScriptedInput,
};

pub use codec::{CodecError, CodecResult, decode_pcm16, encode_pcm16};

pub use frame::{AudioFrame, CAPTURE_MIME_TYPE, CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE};

pub use live::{
    ConnectionOptions, Endpoint, EventCallback, EventStream, FrameForwarder, LiveError,
    LiveResult, LiveSession, ResponseModality, SessionConfig, SessionEvent, SessionState,
    TokenPlacement, ToolDeclaration, ToolInvocation, ToolResponse,
};

pub use playback::{
    AudioOutput, PlaybackError, PlaybackResult, PlaybackScheduler, ScheduledChunk,
    TimelineOutput, WavRecorder,
};
