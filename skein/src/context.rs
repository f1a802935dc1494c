//! The capture context: one per intercepted Vulkan instance.
//!
//! A context owns the next layer's resolved function tables, the list of
//! registered analyzers (the synchronization recorder is always analyzer
//! #0) and the frame-countdown capture budget. The tables are loaded once
//! at instance/device creation and never mutated afterwards, so they can
//! be read concurrently without locking.

use crate::analyzer::Analyzer;
use crate::loader::{PfnGetDeviceProcAddr, PfnGetInstanceProcAddr};
use crate::recorder::SyncRecorder;
use ash::vk;
use once_cell::sync::OnceCell;
use std::mem;
use std::sync::{Arc, Mutex};

/// Frames recorded per capture when the external trigger does not say
/// otherwise.
pub const DEFAULT_CAPTURE_FRAMES: i32 = 5;

/// Capture budget value meaning "not capturing".
const CAPTURE_IDLE: i32 = -1;

/// Next-layer instance-level functions.
pub(crate) struct InstanceTable {
    pub v1_0: vk::InstanceFnV1_0,
    #[cfg(windows)]
    pub khr_win32_surface: vk::KhrWin32SurfaceFn,
}

impl InstanceTable {
    unsafe fn load(gipa: PfnGetInstanceProcAddr, instance: vk::Instance) -> InstanceTable {
        InstanceTable {
            v1_0: vk::InstanceFnV1_0::load(|name| mem::transmute(gipa(instance, name.as_ptr()))),
            #[cfg(windows)]
            khr_win32_surface: vk::KhrWin32SurfaceFn::load(|name| {
                mem::transmute(gipa(instance, name.as_ptr()))
            }),
        }
    }
}

/// Next-layer device-level functions.
pub(crate) struct DeviceTable {
    pub v1_0: vk::DeviceFnV1_0,
    pub v1_1: vk::DeviceFnV1_1,
    pub khr_swapchain: vk::KhrSwapchainFn,
    pub ext_debug_utils: vk::ExtDebugUtilsFn,
    pub ext_debug_marker: vk::ExtDebugMarkerFn,
}

impl DeviceTable {
    unsafe fn load(gdpa: PfnGetDeviceProcAddr, device: vk::Device) -> DeviceTable {
        DeviceTable {
            v1_0: vk::DeviceFnV1_0::load(|name| mem::transmute(gdpa(device, name.as_ptr()))),
            v1_1: vk::DeviceFnV1_1::load(|name| mem::transmute(gdpa(device, name.as_ptr()))),
            khr_swapchain: vk::KhrSwapchainFn::load(|name| {
                mem::transmute(gdpa(device, name.as_ptr()))
            }),
            ext_debug_utils: vk::ExtDebugUtilsFn::load(|name| {
                mem::transmute(gdpa(device, name.as_ptr()))
            }),
            ext_debug_marker: vk::ExtDebugMarkerFn::load(|name| {
                mem::transmute(gdpa(device, name.as_ptr()))
            }),
        }
    }
}

pub struct CaptureContext {
    instance: OnceCell<vk::Instance>,
    physical_device: OnceCell<vk::PhysicalDevice>,
    device: OnceCell<vk::Device>,
    get_instance_proc_addr: OnceCell<PfnGetInstanceProcAddr>,
    get_device_proc_addr: OnceCell<PfnGetDeviceProcAddr>,
    instance_fns: OnceCell<InstanceTable>,
    device_fns: OnceCell<DeviceTable>,
    /// Frozen before the first interception notification.
    analyzers: Vec<Arc<dyn Analyzer>>,
    /// -1 = idle, >0 = presents left to record.
    capture_frames: Mutex<i32>,
    /// Native window tag for the external capture trigger.
    window: Mutex<Option<usize>>,
}

impl CaptureContext {
    /// A context with the synchronization recorder registered.
    pub fn new() -> Arc<CaptureContext> {
        CaptureContext::with_analyzers(vec![Arc::new(SyncRecorder::new()) as Arc<dyn Analyzer>])
    }

    /// A context observing through exactly the given analyzers.
    pub fn with_analyzers(analyzers: Vec<Arc<dyn Analyzer>>) -> Arc<CaptureContext> {
        Arc::new(CaptureContext {
            instance: OnceCell::new(),
            physical_device: OnceCell::new(),
            device: OnceCell::new(),
            get_instance_proc_addr: OnceCell::new(),
            get_device_proc_addr: OnceCell::new(),
            instance_fns: OnceCell::new(),
            device_fns: OnceCell::new(),
            analyzers,
            capture_frames: Mutex::new(CAPTURE_IDLE),
            window: Mutex::new(None),
        })
    }

    /// Resolves the instance-level function table and notifies analyzers.
    pub(crate) fn init_instance(&self, instance: vk::Instance, gipa: PfnGetInstanceProcAddr) {
        let _ = self.instance.set(instance);
        let _ = self.get_instance_proc_addr.set(gipa);
        let table = unsafe { InstanceTable::load(gipa, instance) };
        let _ = self.instance_fns.set(table);

        for analyzer in &self.analyzers {
            analyzer.on_create_instance(instance, gipa);
        }
    }

    /// Resolves the device-level function table and notifies analyzers.
    pub(crate) fn init_device(
        &self,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
        gdpa: PfnGetDeviceProcAddr,
    ) {
        let _ = self.physical_device.set(physical_device);
        let _ = self.device.set(device);
        let _ = self.get_device_proc_addr.set(gdpa);
        let table = unsafe { DeviceTable::load(gdpa, device) };
        let _ = self.device_fns.set(table);

        if let (Some(&instance), Some(&gipa)) =
            (self.instance.get(), self.get_instance_proc_addr.get())
        {
            for analyzer in &self.analyzers {
                analyzer.on_create_device(instance, physical_device, device, gipa, gdpa);
            }
        }
    }

    pub(crate) fn instance(&self) -> Option<vk::Instance> {
        self.instance.get().copied()
    }

    pub(crate) fn get_instance_proc_addr(&self) -> Option<PfnGetInstanceProcAddr> {
        self.get_instance_proc_addr.get().copied()
    }

    pub(crate) fn get_device_proc_addr(&self) -> Option<PfnGetDeviceProcAddr> {
        self.get_device_proc_addr.get().copied()
    }

    pub(crate) fn instance_fns(&self) -> Option<&InstanceTable> {
        self.instance_fns.get()
    }

    pub(crate) fn device_fns(&self) -> Option<&DeviceTable> {
        self.device_fns.get()
    }

    pub(crate) fn analyzers(&self) -> &[Arc<dyn Analyzer>] {
        &self.analyzers
    }

    pub(crate) fn set_window(&self, window: usize) {
        *self.window.lock().unwrap() = Some(window);
    }

    pub fn window(&self) -> Option<usize> {
        *self.window.lock().unwrap()
    }

    /// Whether a capture is currently counting down.
    pub fn is_started(&self) -> bool {
        *self.capture_frames.lock().unwrap() > 0
    }

    /// Begins recording the next `frames` presents.
    pub fn start(&self, frames: i32) {
        *self.capture_frames.lock().unwrap() = frames;
        for analyzer in &self.analyzers {
            analyzer.start();
        }
    }

    /// Called once per successful present; exhausting the budget stops
    /// every analyzer and returns to idle.
    pub fn on_present(&self) {
        let mut frames = self.capture_frames.lock().unwrap();
        if *frames <= 0 {
            return;
        }
        *frames -= 1;
        if *frames == 0 {
            *frames = CAPTURE_IDLE;
            // the lock is not held across the stop hooks: they build and
            // write the graph, which may take a while
            drop(frames);
            for analyzer in &self.analyzers {
                analyzer.stop();
            }
        }
    }
}
