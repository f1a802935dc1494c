//! Process-wide handle registry.
//!
//! Routes every opaque handle an interception may receive to the capture
//! context that owns it. All accessors clone the `Arc` out under the lock
//! and release it before any next-layer call is made.

use crate::context::CaptureContext;
use ash::vk;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::new());
}

pub struct Registry {
    instances: HashMap<vk::Instance, Arc<CaptureContext>>,
    physical_devices: HashMap<vk::PhysicalDevice, Arc<CaptureContext>>,
    devices: HashMap<vk::Device, Arc<CaptureContext>>,
    queues: HashMap<vk::Queue, Arc<CaptureContext>>,
    command_buffers: HashMap<vk::CommandBuffer, Arc<CaptureContext>>,
    windows: HashMap<usize, Arc<CaptureContext>>,
}

impl Registry {
    fn new() -> Registry {
        Registry {
            instances: HashMap::new(),
            physical_devices: HashMap::new(),
            devices: HashMap::new(),
            queues: HashMap::new(),
            command_buffers: HashMap::new(),
            windows: HashMap::new(),
        }
    }

    fn lock() -> MutexGuard<'static, Registry> {
        REGISTRY.lock().unwrap()
    }

    pub(crate) fn associate_instance(handle: vk::Instance, context: Arc<CaptureContext>) {
        Registry::lock().instances.insert(handle, context);
    }

    pub(crate) fn associate_physical_device(
        handle: vk::PhysicalDevice,
        context: Arc<CaptureContext>,
    ) {
        Registry::lock().physical_devices.insert(handle, context);
    }

    pub(crate) fn associate_device(handle: vk::Device, context: Arc<CaptureContext>) {
        Registry::lock().devices.insert(handle, context);
    }

    pub(crate) fn associate_queue(handle: vk::Queue, context: Arc<CaptureContext>) {
        Registry::lock().queues.insert(handle, context);
    }

    pub(crate) fn associate_command_buffer(
        handle: vk::CommandBuffer,
        context: Arc<CaptureContext>,
    ) {
        Registry::lock().command_buffers.insert(handle, context);
    }

    pub(crate) fn associate_window(window: usize, context: Arc<CaptureContext>) {
        Registry::lock().windows.insert(window, context);
    }

    pub(crate) fn forget_instance(handle: vk::Instance) {
        Registry::lock().instances.remove(&handle);
    }

    pub(crate) fn forget_device(handle: vk::Device) {
        Registry::lock().devices.remove(&handle);
    }

    pub(crate) fn forget_command_buffer(handle: vk::CommandBuffer) {
        Registry::lock().command_buffers.remove(&handle);
    }

    pub fn instance_context(handle: vk::Instance) -> Option<Arc<CaptureContext>> {
        Registry::lock().instances.get(&handle).cloned()
    }

    pub fn physical_device_context(
        handle: vk::PhysicalDevice,
    ) -> Option<Arc<CaptureContext>> {
        Registry::lock().physical_devices.get(&handle).cloned()
    }

    pub fn device_context(handle: vk::Device) -> Option<Arc<CaptureContext>> {
        Registry::lock().devices.get(&handle).cloned()
    }

    pub fn queue_context(handle: vk::Queue) -> Option<Arc<CaptureContext>> {
        Registry::lock().queues.get(&handle).cloned()
    }

    pub fn command_buffer_context(
        handle: vk::CommandBuffer,
    ) -> Option<Arc<CaptureContext>> {
        Registry::lock().command_buffers.get(&handle).cloned()
    }

    /// Lookup used by the OS hotkey bridge to start a capture on the
    /// context that owns a window.
    pub fn window_context(window: usize) -> Option<Arc<CaptureContext>> {
        Registry::lock().windows.get(&window).cloned()
    }
}
