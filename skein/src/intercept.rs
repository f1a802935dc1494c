//! The interception façade.
//!
//! Every entry point the layer installs between the application and the
//! next layer lives here. The common shape: route the first handle
//! through the registry, call down with untouched arguments, notify the
//! registered analyzers with those arguments plus the result, return the
//! result. The registry is updated after a successful next-layer call and
//! before any notification that needs to route the new handle.
//!
//! Calls the layer does not install pass through untouched: the proc-addr
//! trampolines hand out the next layer's pointer for any name missing
//! from the dispatch tables below.

use crate::context::CaptureContext;
use crate::layer;
use crate::loader::{self, PfnVoidFunction};
use crate::registry::Registry;
use crate::util::{cstr_arg, raw_slice};
use ash::vk;
use std::mem;
use std::os::raw::c_char;
use tracing::{trace, warn};

/// Result returned when a call arrives with a handle the registry does
/// not know; the call is otherwise a no-op.
const ROUTING_MISS: vk::Result = vk::Result::ERROR_UNKNOWN;

fn pfn(f: usize) -> PfnVoidFunction {
    unsafe { mem::transmute(f) }
}

/// Layer-installed instance-level entry points, by Vulkan name.
fn instance_table_fn(name: &str) -> PfnVoidFunction {
    match name {
        "vkGetInstanceProcAddr" => pfn(get_instance_proc_addr as usize),
        "vkGetDeviceProcAddr" => pfn(get_device_proc_addr as usize),
        "vkCreateInstance" => pfn(create_instance as usize),
        "vkDestroyInstance" => pfn(destroy_instance as usize),
        "vkEnumeratePhysicalDevices" => pfn(enumerate_physical_devices as usize),
        "vkEnumerateInstanceLayerProperties" => pfn(enumerate_instance_layer_properties as usize),
        "vkEnumerateInstanceExtensionProperties" => {
            pfn(enumerate_instance_extension_properties as usize)
        }
        "vkEnumerateDeviceLayerProperties" => pfn(enumerate_device_layer_properties as usize),
        "vkEnumerateDeviceExtensionProperties" => {
            pfn(enumerate_device_extension_properties as usize)
        }
        "vkCreateDevice" => pfn(create_device as usize),
        #[cfg(windows)]
        "vkCreateWin32SurfaceKHR" => pfn(create_win32_surface_khr as usize),
        _ => None,
    }
}

/// Layer-installed device-level entry points, by Vulkan name.
fn device_table_fn(name: &str) -> PfnVoidFunction {
    match name {
        "vkGetDeviceProcAddr" => pfn(get_device_proc_addr as usize),
        "vkDestroyDevice" => pfn(destroy_device as usize),
        "vkGetDeviceQueue" => pfn(get_device_queue as usize),
        "vkGetDeviceQueue2" => pfn(get_device_queue2 as usize),
        "vkQueueSubmit" => pfn(queue_submit as usize),
        "vkQueueWaitIdle" => pfn(queue_wait_idle as usize),
        "vkDeviceWaitIdle" => pfn(device_wait_idle as usize),
        "vkQueueBindSparse" => pfn(queue_bind_sparse as usize),
        "vkResetFences" => pfn(reset_fences as usize),
        "vkGetFenceStatus" => pfn(get_fence_status as usize),
        "vkWaitForFences" => pfn(wait_for_fences as usize),
        "vkAllocateCommandBuffers" => pfn(allocate_command_buffers as usize),
        "vkFreeCommandBuffers" => pfn(free_command_buffers as usize),
        "vkAcquireNextImageKHR" => pfn(acquire_next_image_khr as usize),
        "vkAcquireNextImage2KHR" => pfn(acquire_next_image2_khr as usize),
        "vkQueuePresentKHR" => pfn(queue_present_khr as usize),
        "vkDebugMarkerSetObjectNameEXT" => pfn(debug_marker_set_object_name_ext as usize),
        "vkSetDebugUtilsObjectNameEXT" => pfn(set_debug_utils_object_name_ext as usize),
        _ => None,
    }
}

pub(crate) unsafe extern "system" fn get_instance_proc_addr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> PfnVoidFunction {
    let name = match cstr_arg(p_name) {
        Some(name) => name,
        None => return None,
    };
    let own = instance_table_fn(name);
    if own.is_some() {
        return own;
    }
    if let Some(context) = Registry::instance_context(instance) {
        if let Some(gipa) = context.get_instance_proc_addr() {
            return gipa(instance, p_name);
        }
    }
    None
}

pub(crate) unsafe extern "system" fn get_device_proc_addr(
    device: vk::Device,
    p_name: *const c_char,
) -> PfnVoidFunction {
    let name = match cstr_arg(p_name) {
        Some(name) => name,
        None => return None,
    };
    let own = device_table_fn(name);
    if own.is_some() {
        return own;
    }
    if let Some(context) = Registry::device_context(device) {
        if let Some(gdpa) = context.get_device_proc_addr() {
            return gdpa(device, p_name);
        }
    }
    None
}

pub(crate) unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    if p_create_info.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let chain = loader::find_instance_link_info(p_create_info);
    if chain.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let link = (*chain).u.p_layer_info;
    if link.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let gipa = match (*link).pfn_next_get_instance_proc_addr {
        Some(gipa) => gipa,
        None => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };
    let next_create: loader::PfnCreateInstance =
        match gipa(vk::Instance::null(), b"vkCreateInstance\0".as_ptr() as *const c_char) {
            Some(f) => mem::transmute(f),
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };

    // advance the chain for the next layer down
    (*chain).u.p_layer_info = (*link).p_next;

    let result = next_create(p_create_info, p_allocator, p_instance);

    if result == vk::Result::SUCCESS && !p_instance.is_null() && *p_instance != vk::Instance::null()
    {
        let context = CaptureContext::new();
        Registry::associate_instance(*p_instance, context.clone());
        context.init_instance(*p_instance, gipa);
        trace!("{}: CreateInstance", layer::LAYER_NAME);
    }
    result
}

pub(crate) unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks,
) {
    if let Some(context) = Registry::instance_context(instance) {
        if let Some(fns) = context.instance_fns() {
            (fns.v1_0.destroy_instance)(instance, p_allocator);
        }
        trace!("{}: DestroyInstance", layer::LAYER_NAME);
    }
    Registry::forget_instance(instance);
}

pub(crate) unsafe extern "system" fn enumerate_physical_devices(
    instance: vk::Instance,
    p_physical_device_count: *mut u32,
    p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    let context = match Registry::instance_context(instance) {
        Some(context) => context,
        None => {
            warn!("vkEnumeratePhysicalDevices: unknown instance");
            return ROUTING_MISS;
        }
    };
    let fns = match context.instance_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.enumerate_physical_devices)(
        instance,
        p_physical_device_count,
        p_physical_devices,
    );
    if result == vk::Result::SUCCESS
        && !p_physical_devices.is_null()
        && !p_physical_device_count.is_null()
    {
        for i in 0..(*p_physical_device_count as usize) {
            Registry::associate_physical_device(*p_physical_devices.add(i), context.clone());
        }
    }
    result
}

pub(crate) unsafe extern "system" fn enumerate_instance_layer_properties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    if p_properties.is_null() {
        if !p_property_count.is_null() {
            *p_property_count = 1;
        }
        return vk::Result::SUCCESS;
    }
    if !p_property_count.is_null() && *p_property_count >= 1 {
        *p_properties = layer::layer_properties();
        *p_property_count = 1;
        return vk::Result::SUCCESS;
    }
    vk::Result::INCOMPLETE
}

pub(crate) unsafe extern "system" fn enumerate_instance_extension_properties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    // this layer advertises no instance extensions
    if cstr_arg(p_layer_name) == Some(layer::LAYER_NAME) {
        if !p_property_count.is_null() {
            *p_property_count = 0;
        }
        return vk::Result::SUCCESS;
    }
    vk::Result::ERROR_LAYER_NOT_PRESENT
}

pub(crate) unsafe extern "system" fn enumerate_device_layer_properties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    enumerate_instance_layer_properties(p_property_count, p_properties)
}

pub(crate) unsafe extern "system" fn enumerate_device_extension_properties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if cstr_arg(p_layer_name) == Some(layer::LAYER_NAME) {
        if !p_property_count.is_null() {
            *p_property_count = 0;
        }
        return vk::Result::SUCCESS;
    }
    match Registry::physical_device_context(physical_device).and_then(|context| {
        context.instance_fns().map(|fns| {
            (fns.v1_0.enumerate_device_extension_properties)(
                physical_device,
                p_layer_name,
                p_property_count,
                p_properties,
            )
        })
    }) {
        Some(result) => result,
        None => {
            warn!("vkEnumerateDeviceExtensionProperties: unknown physical device");
            ROUTING_MISS
        }
    }
}

pub(crate) unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result {
    if p_create_info.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let chain = loader::find_device_link_info(p_create_info);
    if chain.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let link = (*chain).u.p_layer_info;
    if link.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let context = match Registry::physical_device_context(physical_device) {
        Some(context) => context,
        None => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };
    let (gipa, gdpa) = match (
        (*link).pfn_next_get_instance_proc_addr,
        (*link).pfn_next_get_device_proc_addr,
    ) {
        (Some(gipa), Some(gdpa)) => (gipa, gdpa),
        _ => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };
    let instance = match context.instance() {
        Some(instance) => instance,
        None => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };
    let next_create: loader::PfnCreateDevice =
        match gipa(instance, b"vkCreateDevice\0".as_ptr() as *const c_char) {
            Some(f) => mem::transmute(f),
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };

    (*chain).u.p_layer_info = (*link).p_next;

    let result = next_create(physical_device, p_create_info, p_allocator, p_device);

    if result == vk::Result::SUCCESS && !p_device.is_null() && *p_device != vk::Device::null() {
        Registry::associate_device(*p_device, context.clone());
        context.init_device(physical_device, *p_device, gdpa);
        trace!("{}: CreateDevice", layer::LAYER_NAME);
    }
    result
}

pub(crate) unsafe extern "system" fn destroy_device(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks,
) {
    if let Some(context) = Registry::device_context(device) {
        if let Some(fns) = context.device_fns() {
            (fns.v1_0.destroy_device)(device, p_allocator);
        }
        trace!("{}: DestroyDevice", layer::LAYER_NAME);
    }
    Registry::forget_device(device);
}

pub(crate) unsafe extern "system" fn get_device_queue(
    device: vk::Device,
    queue_family_index: u32,
    queue_index: u32,
    p_queue: *mut vk::Queue,
) {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkGetDeviceQueue: unknown device");
            return;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return,
    };
    (fns.v1_0.get_device_queue)(device, queue_family_index, queue_index, p_queue);

    if !p_queue.is_null() && *p_queue != vk::Queue::null() {
        for analyzer in context.analyzers() {
            analyzer.get_device_queue(device, queue_family_index, queue_index, *p_queue);
        }
        Registry::associate_queue(*p_queue, context.clone());
    }
}

pub(crate) unsafe extern "system" fn get_device_queue2(
    device: vk::Device,
    p_queue_info: *const vk::DeviceQueueInfo2,
    p_queue: *mut vk::Queue,
) {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkGetDeviceQueue2: unknown device");
            return;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return,
    };
    (fns.v1_1.get_device_queue2)(device, p_queue_info, p_queue);

    if !p_queue.is_null() && *p_queue != vk::Queue::null() && !p_queue_info.is_null() {
        let info = &*p_queue_info;
        for analyzer in context.analyzers() {
            analyzer.get_device_queue(device, info.queue_family_index, info.queue_index, *p_queue);
        }
        Registry::associate_queue(*p_queue, context.clone());
    }
}

pub(crate) unsafe extern "system" fn queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo,
    fence: vk::Fence,
) -> vk::Result {
    let context = match Registry::queue_context(queue) {
        Some(context) => context,
        None => {
            warn!("vkQueueSubmit: unknown queue");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.queue_submit)(queue, submit_count, p_submits, fence);

    let submits = raw_slice(p_submits, submit_count);
    for analyzer in context.analyzers() {
        analyzer.queue_submit(queue, submits, fence, result);
    }
    result
}

pub(crate) unsafe extern "system" fn queue_wait_idle(queue: vk::Queue) -> vk::Result {
    let context = match Registry::queue_context(queue) {
        Some(context) => context,
        None => {
            warn!("vkQueueWaitIdle: unknown queue");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.queue_wait_idle)(queue);
    for analyzer in context.analyzers() {
        analyzer.queue_wait_idle(queue, result);
    }
    result
}

pub(crate) unsafe extern "system" fn device_wait_idle(device: vk::Device) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkDeviceWaitIdle: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.device_wait_idle)(device);
    for analyzer in context.analyzers() {
        analyzer.device_wait_idle(device, result);
    }
    result
}

pub(crate) unsafe extern "system" fn queue_bind_sparse(
    queue: vk::Queue,
    bind_info_count: u32,
    p_bind_info: *const vk::BindSparseInfo,
    fence: vk::Fence,
) -> vk::Result {
    let context = match Registry::queue_context(queue) {
        Some(context) => context,
        None => {
            warn!("vkQueueBindSparse: unknown queue");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.queue_bind_sparse)(queue, bind_info_count, p_bind_info, fence);

    let bind_info = raw_slice(p_bind_info, bind_info_count);
    for analyzer in context.analyzers() {
        analyzer.queue_bind_sparse(queue, bind_info, fence, result);
    }
    result
}

pub(crate) unsafe extern "system" fn reset_fences(
    device: vk::Device,
    fence_count: u32,
    p_fences: *const vk::Fence,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkResetFences: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.reset_fences)(device, fence_count, p_fences);

    let fences = raw_slice(p_fences, fence_count);
    for analyzer in context.analyzers() {
        analyzer.reset_fences(device, fences, result);
    }
    result
}

pub(crate) unsafe extern "system" fn get_fence_status(
    device: vk::Device,
    fence: vk::Fence,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkGetFenceStatus: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.get_fence_status)(device, fence);
    for analyzer in context.analyzers() {
        analyzer.get_fence_status(device, fence, result);
    }
    result
}

pub(crate) unsafe extern "system" fn wait_for_fences(
    device: vk::Device,
    fence_count: u32,
    p_fences: *const vk::Fence,
    wait_all: vk::Bool32,
    timeout: u64,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkWaitForFences: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.wait_for_fences)(device, fence_count, p_fences, wait_all, timeout);

    let fences = raw_slice(p_fences, fence_count);
    for analyzer in context.analyzers() {
        analyzer.wait_for_fences(device, fences, wait_all == vk::TRUE, timeout, result);
    }
    result
}

pub(crate) unsafe extern "system" fn allocate_command_buffers(
    device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkAllocateCommandBuffers: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.v1_0.allocate_command_buffers)(device, p_allocate_info, p_command_buffers);

    if result == vk::Result::SUCCESS && !p_allocate_info.is_null() && !p_command_buffers.is_null()
    {
        for i in 0..(*p_allocate_info).command_buffer_count as usize {
            Registry::associate_command_buffer(*p_command_buffers.add(i), context.clone());
        }
    }
    result
}

pub(crate) unsafe extern "system" fn free_command_buffers(
    device: vk::Device,
    command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkFreeCommandBuffers: unknown device");
            return;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return,
    };
    (fns.v1_0.free_command_buffers)(device, command_pool, command_buffer_count, p_command_buffers);

    for &command_buffer in raw_slice(p_command_buffers, command_buffer_count) {
        Registry::forget_command_buffer(command_buffer);
    }
}

pub(crate) unsafe extern "system" fn acquire_next_image_khr(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    semaphore: vk::Semaphore,
    fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkAcquireNextImageKHR: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.khr_swapchain.acquire_next_image_khr)(
        device,
        swapchain,
        timeout,
        semaphore,
        fence,
        p_image_index,
    );

    let image_index = if acquire_returned_index(result) && !p_image_index.is_null() {
        *p_image_index
    } else {
        0
    };
    for analyzer in context.analyzers() {
        analyzer.acquire_next_image(device, swapchain, semaphore, fence, image_index, result);
    }
    result
}

pub(crate) unsafe extern "system" fn acquire_next_image2_khr(
    device: vk::Device,
    p_acquire_info: *const vk::AcquireNextImageInfoKHR,
    p_image_index: *mut u32,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkAcquireNextImage2KHR: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.khr_swapchain.acquire_next_image2_khr)(device, p_acquire_info, p_image_index);

    if !p_acquire_info.is_null() {
        let info = &*p_acquire_info;
        let image_index = if acquire_returned_index(result) && !p_image_index.is_null() {
            *p_image_index
        } else {
            0
        };
        for analyzer in context.analyzers() {
            analyzer.acquire_next_image(
                device,
                info.swapchain,
                info.semaphore,
                info.fence,
                image_index,
                result,
            );
        }
    }
    result
}

fn acquire_returned_index(result: vk::Result) -> bool {
    result == vk::Result::SUCCESS
        || result == vk::Result::TIMEOUT
        || result == vk::Result::NOT_READY
        || result == vk::Result::SUBOPTIMAL_KHR
}

pub(crate) unsafe extern "system" fn queue_present_khr(
    queue: vk::Queue,
    p_present_info: *const vk::PresentInfoKHR,
) -> vk::Result {
    let context = match Registry::queue_context(queue) {
        Some(context) => context,
        None => {
            warn!("vkQueuePresentKHR: unknown queue");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.khr_swapchain.queue_present_khr)(queue, p_present_info);

    if !p_present_info.is_null() {
        for analyzer in context.analyzers() {
            analyzer.queue_present(queue, &*p_present_info, result);
        }
    }
    if result == vk::Result::SUCCESS || result == vk::Result::SUBOPTIMAL_KHR {
        context.on_present();
    }
    result
}

pub(crate) unsafe extern "system" fn debug_marker_set_object_name_ext(
    device: vk::Device,
    p_name_info: *const vk::DebugMarkerObjectNameInfoEXT,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkDebugMarkerSetObjectNameEXT: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.ext_debug_marker.debug_marker_set_object_name_ext)(device, p_name_info);

    if !p_name_info.is_null() {
        for analyzer in context.analyzers() {
            analyzer.debug_marker_set_object_name(device, &*p_name_info, result);
        }
    }
    result
}

pub(crate) unsafe extern "system" fn set_debug_utils_object_name_ext(
    device: vk::Device,
    p_name_info: *const vk::DebugUtilsObjectNameInfoEXT,
) -> vk::Result {
    let context = match Registry::device_context(device) {
        Some(context) => context,
        None => {
            warn!("vkSetDebugUtilsObjectNameEXT: unknown device");
            return ROUTING_MISS;
        }
    };
    let fns = match context.device_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.ext_debug_utils.set_debug_utils_object_name_ext)(device, p_name_info);

    if !p_name_info.is_null() {
        for analyzer in context.analyzers() {
            analyzer.set_debug_utils_object_name(device, &*p_name_info, result);
        }
    }
    result
}

#[cfg(windows)]
pub(crate) unsafe extern "system" fn create_win32_surface_khr(
    instance: vk::Instance,
    p_create_info: *const vk::Win32SurfaceCreateInfoKHR,
    p_allocator: *const vk::AllocationCallbacks,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    let context = match Registry::instance_context(instance) {
        Some(context) => context,
        None => {
            warn!("vkCreateWin32SurfaceKHR: unknown instance");
            return ROUTING_MISS;
        }
    };
    let fns = match context.instance_fns() {
        Some(fns) => fns,
        None => return ROUTING_MISS,
    };
    let result = (fns.khr_win32_surface.create_win32_surface_khr)(
        instance,
        p_create_info,
        p_allocator,
        p_surface,
    );

    if result == vk::Result::SUCCESS && !p_create_info.is_null() {
        let window = (*p_create_info).hwnd as usize;
        context.set_window(window);
        Registry::associate_window(window, context.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    #[test]
    fn extension_enumeration_for_this_layer_is_empty() {
        let own = CString::new(layer::LAYER_NAME).unwrap();
        let mut count = 77u32;
        let result = unsafe {
            enumerate_instance_extension_properties(own.as_ptr(), &mut count, ptr::null_mut())
        };
        assert_eq!(result, vk::Result::SUCCESS);
        assert_eq!(count, 0);

        // a null count pointer is tolerated
        let result = unsafe {
            enumerate_instance_extension_properties(own.as_ptr(), ptr::null_mut(), ptr::null_mut())
        };
        assert_eq!(result, vk::Result::SUCCESS);

        let other = CString::new("VK_LAYER_KHRONOS_validation").unwrap();
        let result = unsafe {
            enumerate_instance_extension_properties(other.as_ptr(), &mut count, ptr::null_mut())
        };
        assert_eq!(result, vk::Result::ERROR_LAYER_NOT_PRESENT);
    }

    #[test]
    fn layer_enumeration_protocol() {
        let mut count = 0u32;
        let result =
            unsafe { enumerate_instance_layer_properties(&mut count, ptr::null_mut()) };
        assert_eq!(result, vk::Result::SUCCESS);
        assert_eq!(count, 1);

        let mut props = vk::LayerProperties::default();
        let result = unsafe { enumerate_instance_layer_properties(&mut count, &mut props) };
        assert_eq!(result, vk::Result::SUCCESS);
        assert_eq!(count, 1);
        let name = unsafe { std::ffi::CStr::from_ptr(props.layer_name.as_ptr()) };
        assert_eq!(name.to_str().unwrap(), layer::LAYER_NAME);
        assert_eq!(props.implementation_version, 1);

        let mut zero = 0u32;
        let result = unsafe { enumerate_instance_layer_properties(&mut zero, &mut props) };
        assert_eq!(result, vk::Result::INCOMPLETE);
    }

    #[test]
    fn dispatch_tables_are_split_by_level() {
        assert!(instance_table_fn("vkCreateInstance").is_some());
        assert!(instance_table_fn("vkEnumeratePhysicalDevices").is_some());
        assert!(instance_table_fn("vkQueueSubmit").is_none());
        assert!(device_table_fn("vkQueueSubmit").is_some());
        assert!(device_table_fn("vkQueuePresentKHR").is_some());
        assert!(device_table_fn("vkCreateInstance").is_none());
        // everything unknown falls through to the next layer
        assert!(device_table_fn("vkCmdDraw").is_none());
    }
}
