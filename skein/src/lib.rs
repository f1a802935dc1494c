//! skein — a Vulkan layer that records host↔device synchronization
//! activity and emits a GraphViz dependency graph of the capture.
//!
//! The layer sits between the application and the driver. While a capture
//! is running it observes queue submissions, fence and semaphore traffic,
//! swapchain acquire/present and host-side waits across every application
//! thread, reconstructs the happens-before relations between them, and on
//! completion writes a `.dot` file describing the resulting DAG: one lane
//! per thread and per queue, with cross-lane edges for each observed
//! synchronization primitive.
//!
//! Captures are bounded by a frame budget: `CaptureContext::start(n)`
//! records the next `n` presents, then the graph is written and all
//! capture state is dropped. The output path is taken from the
//! `SKEIN_OUTPUT` environment variable.

pub use ash::{self, vk};

pub use crate::{
    analyzer::Analyzer,
    context::{CaptureContext, DEFAULT_CAPTURE_FRAMES},
    layer::LAYER_NAME,
    loader::{
        NegotiateLayerInterface, PfnGetDeviceProcAddr, PfnGetInstanceProcAddr, PfnVoidFunction,
        LOADER_LAYER_INTERFACE_VERSION, NEGOTIATE_INTERFACE_STRUCT,
    },
    output::{OutputError, OUTPUT_ENV},
    recorder::{
        event::{
            AcquireImageEvent, CmdBatchEvent, DeviceWaitIdleEvent, EventHead, FenceSignalEvent,
            QueuePresentEvent, QueueSubmitEvent, QueueWaitIdleEvent, SyncEvent, ThreadId,
            TimePoint, Uid, WaitForFencesEvent,
        },
        SyncRecorder,
    },
    registry::Registry,
};

mod analyzer;
mod context;
mod intercept;
mod layer;
mod loader;
mod output;
mod platform;
mod recorder;
mod registry;
mod util;
