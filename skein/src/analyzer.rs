//! The analyzer capability set.
//!
//! An analyzer observes the intercepted API stream. The synchronization
//! recorder is the one mandatory analyzer; additional ones can be
//! registered on a capture context without touching the interception
//! façade. Hooks default to no-ops so an analyzer only implements the
//! calls it cares about.

use crate::loader::{PfnGetDeviceProcAddr, PfnGetInstanceProcAddr};
use ash::vk;

pub trait Analyzer: Send + Sync {
    /// Notified once the next-layer instance exists and is routable.
    fn on_create_instance(&self, _instance: vk::Instance, _gipa: PfnGetInstanceProcAddr) {}

    /// Notified once the next-layer device exists and is routable.
    fn on_create_device(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        _device: vk::Device,
        _gipa: PfnGetInstanceProcAddr,
        _gdpa: PfnGetDeviceProcAddr,
    ) {
    }

    /// A capture begins.
    fn start(&self);

    /// The capture budget ran out; consume and reset captured state.
    fn stop(&self);

    fn get_device_queue(
        &self,
        _device: vk::Device,
        _queue_family_index: u32,
        _queue_index: u32,
        _queue: vk::Queue,
    ) {
    }

    fn queue_submit(
        &self,
        _queue: vk::Queue,
        _submits: &[vk::SubmitInfo],
        _fence: vk::Fence,
        _result: vk::Result,
    ) {
    }

    fn queue_wait_idle(&self, _queue: vk::Queue, _result: vk::Result) {}

    fn device_wait_idle(&self, _device: vk::Device, _result: vk::Result) {}

    fn queue_bind_sparse(
        &self,
        _queue: vk::Queue,
        _bind_info: &[vk::BindSparseInfo],
        _fence: vk::Fence,
        _result: vk::Result,
    ) {
    }

    fn reset_fences(&self, _device: vk::Device, _fences: &[vk::Fence], _result: vk::Result) {}

    fn get_fence_status(&self, _device: vk::Device, _fence: vk::Fence, _result: vk::Result) {}

    fn wait_for_fences(
        &self,
        _device: vk::Device,
        _fences: &[vk::Fence],
        _wait_all: bool,
        _timeout: u64,
        _result: vk::Result,
    ) {
    }

    /// Covers both `vkAcquireNextImageKHR` and `vkAcquireNextImage2KHR`;
    /// the façade unpacks the info struct of the latter.
    fn acquire_next_image(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
        _semaphore: vk::Semaphore,
        _fence: vk::Fence,
        _image_index: u32,
        _result: vk::Result,
    ) {
    }

    fn queue_present(
        &self,
        _queue: vk::Queue,
        _present_info: &vk::PresentInfoKHR,
        _result: vk::Result,
    ) {
    }

    fn debug_marker_set_object_name(
        &self,
        _device: vk::Device,
        _name_info: &vk::DebugMarkerObjectNameInfoEXT,
        _result: vk::Result,
    ) {
    }

    fn set_debug_utils_object_name(
        &self,
        _device: vk::Device,
        _name_info: &vk::DebugUtilsObjectNameInfoEXT,
        _result: vk::Result,
    ) {
    }
}
