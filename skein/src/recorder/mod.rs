//! The synchronization recorder.
//!
//! The recorder is the mandatory analyzer. It reconstructs happens-before
//! relations from the intercepted call stream: every event is placed on
//! the timeline of the thread that issued it and, for device-side work,
//! the timeline of the queue that executes it; cross-timeline edges are
//! derived from the signal-state maps (semaphore → producer, fence →
//! producers, swapchain image → acquire).
//!
//! Everything lives in one state block behind a plain mutex, taken exactly
//! once per interception. The lock is never held across a next-layer call.

pub mod event;
mod graph;

use crate::analyzer::Analyzer;
use crate::loader::{
    PfnGetDeviceProcAddr, PfnGetInstanceProcAddr, PfnGetPhysicalDeviceQueueFamilyProperties,
};
use crate::util::{cstr_to_string, raw_slice};
use crate::{output, platform};
use ash::vk;
use ash::vk::Handle;
use event::{
    AcquireImageEvent, CmdBatchEvent, DeviceWaitIdleEvent, EventHead, FenceSignalEvent,
    QueuePresentEvent, QueueSubmitEvent, QueueWaitIdleEvent, SyncEvent, ThreadId, TimePoint, Uid,
    WaitForFencesEvent,
};
use std::collections::HashMap;
use std::mem;
use std::os::raw::c_char;
use std::ptr;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{error, trace};

pub(crate) struct QueueInfo {
    pub device: vk::Device,
    pub family_index: u32,
    pub queue_index: u32,
    pub name: String,
}

pub(crate) struct DeviceInfo {
    pub queue_family_props: Vec<vk::QueueFamilyProperties>,
}

pub(crate) struct RecorderState {
    enabled: bool,
    start_time: Instant,
    uid_counter: u32,
    thread_counter: u32,
    thread_ids: HashMap<std::thread::ThreadId, ThreadId>,
    pub(crate) thread_names: HashMap<ThreadId, String>,
    pub(crate) devices: HashMap<vk::Device, DeviceInfo>,
    pub(crate) queues: HashMap<vk::Queue, QueueInfo>,
    /// Append-only while a capture is enabled; consumed by `stop`.
    pub(crate) log: Vec<SyncEvent>,
    /// Latest unconsumed signal per semaphore.
    signal_semaphores: HashMap<vk::Semaphore, Uid>,
    /// Events that may signal each fence; rewritten per submission.
    signal_fences: HashMap<vk::Fence, Vec<Uid>>,
    /// Acquire event per swapchain image index.
    swapchains: HashMap<vk::SwapchainKHR, Vec<Option<Uid>>>,
}

impl RecorderState {
    fn new() -> RecorderState {
        RecorderState {
            enabled: false,
            start_time: Instant::now(),
            uid_counter: 0,
            thread_counter: 0,
            thread_ids: HashMap::new(),
            thread_names: HashMap::new(),
            devices: HashMap::new(),
            queues: HashMap::new(),
            log: Vec::new(),
            signal_semaphores: HashMap::new(),
            signal_fences: HashMap::new(),
            swapchains: HashMap::new(),
        }
    }

    fn next_uid(&mut self) -> Uid {
        self.uid_counter += 1;
        Uid::new(self.uid_counter)
    }

    fn time_point(&self) -> TimePoint {
        TimePoint(self.start_time.elapsed().as_micros() as u64)
    }

    fn thread_id(&mut self) -> ThreadId {
        let native = std::thread::current().id();
        if let Some(&tid) = self.thread_ids.get(&native) {
            return tid;
        }
        let tid = ThreadId(self.thread_counter);
        self.thread_counter += 1;
        if let Some(name) = platform::current_thread_description() {
            self.thread_names.insert(tid, name);
        }
        self.thread_ids.insert(native, tid);
        tid
    }

    fn queue_device(&self, queue: vk::Queue) -> vk::Device {
        self.queues
            .get(&queue)
            .map(|q| q.device)
            .unwrap_or_else(vk::Device::null)
    }

    /// Moves the pending signal of each waited semaphore into `deps`.
    fn consume_semaphore_signals(&mut self, waits: &[vk::Semaphore], deps: &mut Vec<Uid>) {
        for &semaphore in waits {
            match self.signal_semaphores.remove(&semaphore) {
                Some(producer) => deps.push(producer),
                None => trace!(?semaphore, "wait on semaphore with no recorded signal"),
            }
        }
    }

    fn default_queue_name(&self, device: vk::Device, family_index: u32, queue_index: u32) -> String {
        let flags = self
            .devices
            .get(&device)
            .and_then(|d| d.queue_family_props.get(family_index as usize))
            .map(|p| p.queue_flags)
            .unwrap_or_else(vk::QueueFlags::empty);

        if flags.contains(vk::QueueFlags::GRAPHICS) {
            format!("Graphics_{}", queue_index)
        } else if flags.contains(vk::QueueFlags::COMPUTE) {
            format!("Compute_{}", queue_index)
        } else if flags.contains(vk::QueueFlags::TRANSFER) {
            format!("Transfer_{}", queue_index)
        } else {
            format!("Queue_{}", queue_index)
        }
    }

    fn clear_signal_state(&mut self) {
        self.signal_semaphores.clear();
        self.signal_fences.clear();
        self.swapchains.clear();
    }
}

pub struct SyncRecorder {
    state: Mutex<RecorderState>,
}

impl SyncRecorder {
    pub fn new() -> SyncRecorder {
        SyncRecorder {
            state: Mutex::new(RecorderState::new()),
        }
    }

    /// Snapshot of the recorded event log.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.state.lock().unwrap().log.clone()
    }

    /// Renders the current log as a GraphViz document without consuming it.
    pub fn dot(&self) -> String {
        graph::build(&self.state.lock().unwrap())
    }
}

impl Default for SyncRecorder {
    fn default() -> SyncRecorder {
        SyncRecorder::new()
    }
}

unsafe fn query_queue_family_properties(
    gipa: PfnGetInstanceProcAddr,
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
) -> Vec<vk::QueueFamilyProperties> {
    let pfn: PfnGetPhysicalDeviceQueueFamilyProperties = match gipa(
        instance,
        b"vkGetPhysicalDeviceQueueFamilyProperties\0".as_ptr() as *const c_char,
    ) {
        Some(f) => mem::transmute(f),
        None => return Vec::new(),
    };

    let mut count = 0u32;
    pfn(physical_device, &mut count, ptr::null_mut());
    if count == 0 {
        return Vec::new();
    }
    let mut props = vec![vk::QueueFamilyProperties::default(); count as usize];
    pfn(physical_device, &mut count, props.as_mut_ptr());
    props.truncate(count as usize);
    props
}

impl Analyzer for SyncRecorder {
    fn on_create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
        gipa: PfnGetInstanceProcAddr,
        _gdpa: PfnGetDeviceProcAddr,
    ) {
        let props = unsafe { query_queue_family_properties(gipa, instance, physical_device) };
        let mut state = self.state.lock().unwrap();
        state.devices.insert(
            device,
            DeviceInfo {
                queue_family_props: props,
            },
        );
    }

    fn start(&self) {
        let mut state = self.state.lock().unwrap();
        state.enabled = true;
        state.start_time = Instant::now();
        state.clear_signal_state();
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        let dot = graph::build(&state);
        let path = output::output_path();
        match output::save_dot(&path, &dot) {
            Ok(()) => trace!(?path, events = state.log.len(), "capture written"),
            // the capture is dropped; the layer stays usable
            Err(err) => error!("failed to write capture to {:?}: {}", path, err),
        }
        state.log.clear();
        state.clear_signal_state();
        state.enabled = false;
    }

    fn get_device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
        queue: vk::Queue,
    ) {
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.queues.get_mut(&queue) {
            // re-retrieval; an application-supplied name is kept
            info.device = device;
            info.family_index = queue_family_index;
            info.queue_index = queue_index;
            return;
        }
        let name = state.default_queue_name(device, queue_family_index, queue_index);
        state.queues.insert(
            queue,
            QueueInfo {
                device,
                family_index: queue_family_index,
                queue_index,
                name,
            },
        );
    }

    fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        fence: vk::Fence,
        result: vk::Result,
    ) {
        if result != vk::Result::SUCCESS {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }

        let thread = state.thread_id();
        let time = state.time_point();
        let device = state.queue_device(queue);

        if fence != vk::Fence::null() {
            state.signal_fences.insert(fence, Vec::new());
        }

        let mut batches = Vec::with_capacity(submits.len());
        for submit in submits {
            let wait_semaphores = unsafe {
                raw_slice(submit.p_wait_semaphores, submit.wait_semaphore_count).to_vec()
            };
            let signal_semaphores = unsafe {
                raw_slice(submit.p_signal_semaphores, submit.signal_semaphore_count).to_vec()
            };

            let uid = state.next_uid();
            let mut wait_deps = Vec::new();
            state.consume_semaphore_signals(&wait_semaphores, &mut wait_deps);
            for &semaphore in &signal_semaphores {
                state.signal_semaphores.insert(semaphore, uid);
            }

            batches.push(uid);
            state.log.push(SyncEvent::CmdBatch(CmdBatchEvent {
                head: EventHead {
                    device,
                    thread,
                    time,
                    uid,
                },
                queue,
                signal_semaphores,
                wait_semaphores,
                wait_deps,
            }));
        }

        let uid = state.next_uid();
        state.log.push(SyncEvent::QueueSubmit(QueueSubmitEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            batches: batches.clone(),
        }));

        if fence != vk::Fence::null() {
            let uid = state.next_uid();
            state.log.push(SyncEvent::FenceSignal(FenceSignalEvent {
                head: EventHead {
                    device,
                    thread,
                    // strictly after the submit, even within one microsecond
                    time: time.succ(),
                    uid,
                },
                queue,
                fence,
                depends_on: batches,
            }));
            state.signal_fences.insert(fence, vec![uid]);
        }
    }

    fn queue_wait_idle(&self, queue: vk::Queue, result: vk::Result) {
        if result != vk::Result::SUCCESS {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        let thread = state.thread_id();
        let time = state.time_point();
        let device = state.queue_device(queue);
        let uid = state.next_uid();
        state.log.push(SyncEvent::QueueWaitIdle(QueueWaitIdleEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            queue,
        }));
    }

    fn device_wait_idle(&self, device: vk::Device, result: vk::Result) {
        if result != vk::Result::SUCCESS {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        let thread = state.thread_id();
        let time = state.time_point();
        let uid = state.next_uid();
        state.log.push(SyncEvent::DeviceWaitIdle(DeviceWaitIdleEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
        }));
    }

    fn queue_bind_sparse(
        &self,
        _queue: vk::Queue,
        _bind_info: &[vk::BindSparseInfo],
        _fence: vk::Fence,
        _result: vk::Result,
    ) {
        // accepted but recorded as a no-op; sparse binds would otherwise
        // follow the same semaphore/fence rules as vkQueueSubmit
    }

    fn reset_fences(&self, _device: vk::Device, fences: &[vk::Fence], result: vk::Result) {
        if result != vk::Result::SUCCESS {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        for fence in fences {
            state.signal_fences.remove(fence);
        }
    }

    fn get_fence_status(&self, device: vk::Device, fence: vk::Fence, result: vk::Result) {
        if result != vk::Result::SUCCESS && result != vk::Result::TIMEOUT {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        let thread = state.thread_id();
        let time = state.time_point();
        let fence_deps = state.signal_fences.get(&fence).cloned().unwrap_or_default();
        let uid = state.next_uid();
        state.log.push(SyncEvent::WaitForFences(WaitForFencesEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            fences: vec![fence],
            fence_deps,
            wait_all: true,
            timed_out: result == vk::Result::TIMEOUT,
        }));
    }

    fn wait_for_fences(
        &self,
        device: vk::Device,
        fences: &[vk::Fence],
        wait_all: bool,
        _timeout: u64,
        result: vk::Result,
    ) {
        if result != vk::Result::SUCCESS && result != vk::Result::TIMEOUT {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        let thread = state.thread_id();
        let time = state.time_point();

        let mut fence_deps = Vec::new();
        for fence in fences {
            match state.signal_fences.get(fence) {
                Some(producers) => fence_deps.extend_from_slice(producers),
                None => trace!(?fence, "wait on fence with no recorded signal"),
            }
        }

        let uid = state.next_uid();
        state.log.push(SyncEvent::WaitForFences(WaitForFencesEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            fences: fences.to_vec(),
            fence_deps,
            wait_all,
            timed_out: result == vk::Result::TIMEOUT,
        }));
    }

    fn acquire_next_image(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
        image_index: u32,
        result: vk::Result,
    ) {
        if result != vk::Result::SUCCESS && result != vk::Result::TIMEOUT {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        let thread = state.thread_id();
        let time = state.time_point();
        let uid = state.next_uid();

        if semaphore != vk::Semaphore::null() {
            state.signal_semaphores.insert(semaphore, uid);
        }
        if fence != vk::Fence::null() {
            state.signal_fences.entry(fence).or_default().push(uid);
        }

        let images = state.swapchains.entry(swapchain).or_default();
        if images.len() <= image_index as usize {
            images.resize(image_index as usize + 1, None);
        }
        images[image_index as usize] = Some(uid);

        state.log.push(SyncEvent::AcquireImage(AcquireImageEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            swapchain,
            semaphore,
            fence,
        }));
    }

    fn queue_present(
        &self,
        queue: vk::Queue,
        present_info: &vk::PresentInfoKHR,
        result: vk::Result,
    ) {
        if result != vk::Result::SUCCESS && result != vk::Result::SUBOPTIMAL_KHR {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            return;
        }

        let wait_semaphores = unsafe {
            raw_slice(
                present_info.p_wait_semaphores,
                present_info.wait_semaphore_count,
            )
            .to_vec()
        };
        let presented = unsafe {
            raw_slice(present_info.p_swapchains, present_info.swapchain_count)
        };
        let image_indices = unsafe {
            raw_slice(present_info.p_image_indices, present_info.swapchain_count)
        };

        let thread = state.thread_id();
        let time = state.time_point();
        let device = state.queue_device(queue);
        let uid = state.next_uid();

        let mut wait_deps = Vec::new();
        state.consume_semaphore_signals(&wait_semaphores, &mut wait_deps);

        let swapchains = presented
            .iter()
            .zip(image_indices)
            .map(|(&swapchain, &image_index)| {
                let acquire = state
                    .swapchains
                    .get(&swapchain)
                    .and_then(|images| images.get(image_index as usize))
                    .copied()
                    .flatten();
                if acquire.is_none() {
                    trace!(?swapchain, image_index, "present of an image with no recorded acquire");
                }
                (swapchain, acquire)
            })
            .collect();

        state.log.push(SyncEvent::QueuePresent(QueuePresentEvent {
            head: EventHead {
                device,
                thread,
                time,
                uid,
            },
            queue,
            wait_semaphores,
            wait_deps,
            swapchains,
        }));
    }

    fn debug_marker_set_object_name(
        &self,
        _device: vk::Device,
        name_info: &vk::DebugMarkerObjectNameInfoEXT,
        _result: vk::Result,
    ) {
        if name_info.object_type != vk::DebugReportObjectTypeEXT::QUEUE {
            return;
        }
        let name = unsafe { cstr_to_string(name_info.p_object_name) };
        let queue = vk::Queue::from_raw(name_info.object);
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.queues.get_mut(&queue) {
            info.name = name;
        }
    }

    fn set_debug_utils_object_name(
        &self,
        _device: vk::Device,
        name_info: &vk::DebugUtilsObjectNameInfoEXT,
        _result: vk::Result,
    ) {
        if name_info.object_type != vk::ObjectType::QUEUE {
            return;
        }
        let name = unsafe { cstr_to_string(name_info.p_object_name) };
        let queue = vk::Queue::from_raw(name_info.object_handle);
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.queues.get_mut(&queue) {
            info.name = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_clears_log_and_signal_state() {
        let out = std::env::temp_dir().join(format!("skein_stop_{}.dot", std::process::id()));
        std::env::set_var(output::OUTPUT_ENV, &out);

        let recorder = SyncRecorder::new();
        recorder.start();

        let queue = vk::Queue::from_raw(0x10);
        let semaphore = vk::Semaphore::from_raw(0x20);
        let fence = vk::Fence::from_raw(0x30);
        recorder.get_device_queue(vk::Device::from_raw(0x1), 0, 0, queue);

        let submit = vk::SubmitInfo {
            signal_semaphore_count: 1,
            p_signal_semaphores: &semaphore,
            ..Default::default()
        };
        recorder.queue_submit(queue, &[submit], fence, vk::Result::SUCCESS);
        recorder.acquire_next_image(
            vk::Device::from_raw(0x1),
            vk::SwapchainKHR::from_raw(0x40),
            vk::Semaphore::null(),
            vk::Fence::null(),
            0,
            vk::Result::SUCCESS,
        );

        {
            let state = recorder.state.lock().unwrap();
            assert!(!state.log.is_empty());
            assert!(!state.signal_semaphores.is_empty());
            assert!(!state.signal_fences.is_empty());
            assert!(!state.swapchains.is_empty());
        }

        recorder.stop();

        let state = recorder.state.lock().unwrap();
        assert!(state.log.is_empty());
        assert!(state.signal_semaphores.is_empty());
        assert!(state.signal_fences.is_empty());
        assert!(state.swapchains.is_empty());
        assert!(!state.enabled);
        assert!(out.exists());
        std::fs::remove_file(&out).ok();
    }

    unsafe extern "system" fn fake_queue_family_properties(
        _physical_device: vk::PhysicalDevice,
        p_count: *mut u32,
        p_props: *mut vk::QueueFamilyProperties,
    ) {
        *p_count = 2;
        if !p_props.is_null() {
            (*p_props).queue_flags =
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
            (*p_props.add(1)).queue_flags = vk::QueueFlags::TRANSFER;
        }
    }

    unsafe extern "system" fn fake_gipa(
        _instance: vk::Instance,
        p_name: *const c_char,
    ) -> crate::loader::PfnVoidFunction {
        let name = std::ffi::CStr::from_ptr(p_name);
        if name.to_bytes() == b"vkGetPhysicalDeviceQueueFamilyProperties" {
            Some(mem::transmute(fake_queue_family_properties as usize))
        } else {
            None
        }
    }

    unsafe extern "system" fn fake_gdpa(
        _device: vk::Device,
        _p_name: *const c_char,
    ) -> crate::loader::PfnVoidFunction {
        None
    }

    #[test]
    fn queue_names_derive_from_family_capabilities() {
        let recorder = SyncRecorder::new();
        let instance = vk::Instance::from_raw(0x1);
        let physical_device = vk::PhysicalDevice::from_raw(0x2);
        let device = vk::Device::from_raw(0x3);
        recorder.on_create_device(instance, physical_device, device, fake_gipa, fake_gdpa);

        recorder.get_device_queue(device, 0, 0, vk::Queue::from_raw(0x20));
        recorder.get_device_queue(device, 1, 0, vk::Queue::from_raw(0x21));
        recorder.get_device_queue(device, 7, 3, vk::Queue::from_raw(0x22));

        let state = recorder.state.lock().unwrap();
        assert_eq!(state.queues[&vk::Queue::from_raw(0x20)].name, "Graphics_0");
        assert_eq!(state.queues[&vk::Queue::from_raw(0x21)].name, "Transfer_0");
        // unknown family index falls back to the generic name
        assert_eq!(state.queues[&vk::Queue::from_raw(0x22)].name, "Queue_3");
    }

    #[test]
    fn disabled_recorder_records_nothing() {
        let recorder = SyncRecorder::new();
        let queue = vk::Queue::from_raw(0x11);
        recorder.queue_submit(
            queue,
            &[vk::SubmitInfo::default()],
            vk::Fence::null(),
            vk::Result::SUCCESS,
        );
        assert!(recorder.events().is_empty());
    }
}
