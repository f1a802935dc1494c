//! Event identifiers and the recorded event kinds.
//!
//! # About UIDs and time points
//!
//! The **UID** of an event uniquely identifies it among every event
//! recorded during a capture, regardless of the thread or queue it was
//! observed on. UID 0 is considered invalid, so events start at UID 1.
//! Cross-timeline dependencies (semaphore hand-offs, fence waits,
//! swapchain provenance) are expressed as UID references, never as
//! pointers, so the event log is a flat append-only vector and the
//! dependency graph over UIDs is acyclic by construction.
//!
//! The **time point** of an event is the microsecond offset from the
//! moment the capture started. It is only a layout hint for the graph
//! emitter (events sharing a time point land in the same rank); causal
//! order is carried exclusively by the explicit UID edges. A few events
//! produced by one interception deliberately differ by +1 microsecond to
//! force a left-to-right placement (a fence signal lands after the submit
//! that produced it).

use ash::vk;
use std::fmt;

/// Unique identifier of a recorded event.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Uid(u32);

impl Uid {
    pub(crate) const fn new(raw: u32) -> Uid {
        Uid(raw)
    }

    /// The raw value; used for `cn_<uid>` / `gn_<uid>` node names.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this UID refers to an actual event.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Microseconds since the capture started; a rank hint, not an ordering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct TimePoint(pub u64);

impl TimePoint {
    /// The next microsecond; forces strict left-to-right placement.
    pub(crate) const fn succ(self) -> TimePoint {
        TimePoint(self.0 + 1)
    }
}

/// Dense per-capture thread identifier, assigned on first observation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct ThreadId(pub u32);

/// Fields shared by every recorded event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EventHead {
    pub device: vk::Device,
    pub thread: ThreadId,
    pub time: TimePoint,
    pub uid: Uid,
}

/// A call to `vkQueueSubmit`; references the batches it introduced.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueSubmitEvent {
    pub head: EventHead,
    pub batches: Vec<Uid>,
}

/// One submitted batch: command buffers plus its semaphore sets.
#[derive(Clone, Debug, PartialEq)]
pub struct CmdBatchEvent {
    pub head: EventHead,
    pub queue: vk::Queue,
    pub signal_semaphores: Vec<vk::Semaphore>,
    pub wait_semaphores: Vec<vk::Semaphore>,
    /// Producers whose semaphore signals this batch consumed.
    pub wait_deps: Vec<Uid>,
}

/// Device-side fence signal triggered by the completion of batches.
#[derive(Clone, Debug, PartialEq)]
pub struct FenceSignalEvent {
    pub head: EventHead,
    pub queue: vk::Queue,
    pub fence: vk::Fence,
    pub depends_on: Vec<Uid>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueueWaitIdleEvent {
    pub head: EventHead,
    pub queue: vk::Queue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceWaitIdleEvent {
    pub head: EventHead,
}

/// Host-side fence wait or poll (`vkWaitForFences`, `vkGetFenceStatus`).
#[derive(Clone, Debug, PartialEq)]
pub struct WaitForFencesEvent {
    pub head: EventHead,
    pub fences: Vec<vk::Fence>,
    /// Fence-signal events that may satisfy this wait.
    pub fence_deps: Vec<Uid>,
    pub wait_all: bool,
    pub timed_out: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AcquireImageEvent {
    pub head: EventHead,
    pub swapchain: vk::SwapchainKHR,
    pub semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

/// A call to `vkQueuePresentKHR` with the provenance of each image.
#[derive(Clone, Debug, PartialEq)]
pub struct QueuePresentEvent {
    pub head: EventHead,
    pub queue: vk::Queue,
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_deps: Vec<Uid>,
    /// Presented swapchains paired with the acquire event that produced
    /// the presented image index, when one was observed.
    pub swapchains: Vec<(vk::SwapchainKHR, Option<Uid>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    QueueSubmit(QueueSubmitEvent),
    CmdBatch(CmdBatchEvent),
    FenceSignal(FenceSignalEvent),
    QueueWaitIdle(QueueWaitIdleEvent),
    DeviceWaitIdle(DeviceWaitIdleEvent),
    WaitForFences(WaitForFencesEvent),
    AcquireImage(AcquireImageEvent),
    QueuePresent(QueuePresentEvent),
}

impl SyncEvent {
    pub fn head(&self) -> &EventHead {
        match self {
            SyncEvent::QueueSubmit(e) => &e.head,
            SyncEvent::CmdBatch(e) => &e.head,
            SyncEvent::FenceSignal(e) => &e.head,
            SyncEvent::QueueWaitIdle(e) => &e.head,
            SyncEvent::DeviceWaitIdle(e) => &e.head,
            SyncEvent::WaitForFences(e) => &e.head,
            SyncEvent::AcquireImage(e) => &e.head,
            SyncEvent::QueuePresent(e) => &e.head,
        }
    }

    pub fn uid(&self) -> Uid {
        self.head().uid
    }

    pub fn time(&self) -> TimePoint {
        self.head().time
    }
}
