//! Loader-facing ABI: the negotiation struct and the layer link chain.
//!
//! These types mirror `vk_layer.h`, which `ash` does not generate. The
//! loader attaches a chain of `VkLayerInstanceCreateInfo` /
//! `VkLayerDeviceCreateInfo` structures to the create-info `pNext` list;
//! the entry tagged `LAYER_LINK_INFO` carries the next layer's proc-addr
//! functions and must be advanced by one link before calling down.

use ash::vk;
use std::os::raw::{c_char, c_void};

pub type PfnVoidFunction = Option<unsafe extern "system" fn()>;

pub type PfnGetInstanceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, p_name: *const c_char) -> PfnVoidFunction;

pub type PfnGetDeviceProcAddr =
    unsafe extern "system" fn(device: vk::Device, p_name: *const c_char) -> PfnVoidFunction;

pub type PfnGetPhysicalDeviceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, p_name: *const c_char) -> PfnVoidFunction;

pub(crate) type PfnCreateInstance = unsafe extern "system" fn(
    p_create_info: *const vk::InstanceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result;

pub(crate) type PfnCreateDevice = unsafe extern "system" fn(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result;

pub(crate) type PfnGetPhysicalDeviceQueueFamilyProperties = unsafe extern "system" fn(
    physical_device: vk::PhysicalDevice,
    p_queue_family_property_count: *mut u32,
    p_queue_family_properties: *mut vk::QueueFamilyProperties,
);

/// Highest loader<->layer interface version this layer speaks.
pub const LOADER_LAYER_INTERFACE_VERSION: u32 = 2;

/// `LAYER_NEGOTIATE_INTERFACE_STRUCT` from `vk_layer.h`.
pub const NEGOTIATE_INTERFACE_STRUCT: i32 = 1;

/// `VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO`, defined by the loader
/// outside of the registry.
pub(crate) const LOADER_INSTANCE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(47);
/// `VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO`.
pub(crate) const LOADER_DEVICE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(48);

/// `VkLayerFunction`: the chain entry we care about is the link info.
pub(crate) const LAYER_LINK_INFO: i32 = 0;

#[repr(C)]
pub struct NegotiateLayerInterface {
    pub s_type: i32,
    pub p_next: *mut c_void,
    pub loader_layer_interface_version: u32,
    pub pfn_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub pfn_get_device_proc_addr: Option<PfnGetDeviceProcAddr>,
    pub pfn_get_physical_device_proc_addr: Option<PfnGetPhysicalDeviceProcAddr>,
}

#[repr(C)]
pub(crate) struct LayerInstanceLink {
    pub p_next: *mut LayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub pfn_next_get_physical_device_proc_addr: Option<PfnGetPhysicalDeviceProcAddr>,
}

#[repr(C)]
pub(crate) union LayerInstanceInfo {
    pub p_layer_info: *mut LayerInstanceLink,
    pub pfn_set_instance_loader_data: PfnVoidFunction,
}

#[repr(C)]
pub(crate) struct LayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: i32,
    pub u: LayerInstanceInfo,
}

#[repr(C)]
pub(crate) struct LayerDeviceLink {
    pub p_next: *mut LayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub pfn_next_get_device_proc_addr: Option<PfnGetDeviceProcAddr>,
}

#[repr(C)]
pub(crate) union LayerDeviceInfo {
    pub p_layer_info: *mut LayerDeviceLink,
    pub pfn_set_device_loader_data: PfnVoidFunction,
}

#[repr(C)]
pub(crate) struct LayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: i32,
    pub u: LayerDeviceInfo,
}

/// Walks the instance create-info chain to the loader's link-info entry.
pub(crate) unsafe fn find_instance_link_info(
    create_info: *const vk::InstanceCreateInfo,
) -> *mut LayerInstanceCreateInfo {
    let mut chain = (*create_info).p_next as *mut LayerInstanceCreateInfo;
    while !chain.is_null()
        && !((*chain).s_type == LOADER_INSTANCE_CREATE_INFO && (*chain).function == LAYER_LINK_INFO)
    {
        chain = (*chain).p_next as *mut LayerInstanceCreateInfo;
    }
    chain
}

/// Walks the device create-info chain to the loader's link-info entry.
pub(crate) unsafe fn find_device_link_info(
    create_info: *const vk::DeviceCreateInfo,
) -> *mut LayerDeviceCreateInfo {
    let mut chain = (*create_info).p_next as *mut LayerDeviceCreateInfo;
    while !chain.is_null()
        && !((*chain).s_type == LOADER_DEVICE_CREATE_INFO && (*chain).function == LAYER_LINK_INFO)
    {
        chain = (*chain).p_next as *mut LayerDeviceCreateInfo;
    }
    chain
}
