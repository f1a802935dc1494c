//! Layer identity and the entry points exported to the host loader.

use crate::intercept;
use crate::loader::{self, NegotiateLayerInterface, PfnVoidFunction};
use ash::vk;
use std::os::raw::c_char;

pub const LAYER_NAME: &str = "VK_LAYER_SKEIN_sync_graph";

const LAYER_DESCRIPTION: &str = "synchronization graph capture layer";
const LAYER_IMPLEMENTATION_VERSION: u32 = 1;

fn write_c_string(dst: &mut [c_char], s: &str) {
    for (i, byte) in s.bytes().take(dst.len() - 1).enumerate() {
        dst[i] = byte as c_char;
    }
}

pub(crate) fn layer_properties() -> vk::LayerProperties {
    let mut props = vk::LayerProperties {
        spec_version: vk::make_version(1, 2, 0),
        implementation_version: LAYER_IMPLEMENTATION_VERSION,
        ..Default::default()
    };
    write_c_string(&mut props.layer_name, LAYER_NAME);
    write_c_string(&mut props.description, LAYER_DESCRIPTION);
    props
}

/// Loader negotiation: publish the trampolines, clamp the interface
/// version to what this layer supports.
#[no_mangle]
pub unsafe extern "system" fn vkNegotiateLoaderLayerInterfaceVersion(
    p_version_struct: *mut NegotiateLayerInterface,
) -> vk::Result {
    if p_version_struct.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let version = &mut *p_version_struct;

    if version.loader_layer_interface_version >= loader::LOADER_LAYER_INTERFACE_VERSION {
        version.pfn_get_instance_proc_addr = Some(intercept::get_instance_proc_addr);
        version.pfn_get_device_proc_addr = Some(intercept::get_device_proc_addr);
        version.pfn_get_physical_device_proc_addr = None;
    }
    if version.loader_layer_interface_version > loader::LOADER_LAYER_INTERFACE_VERSION {
        version.loader_layer_interface_version = loader::LOADER_LAYER_INTERFACE_VERSION;
    }
    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "system" fn vkGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> PfnVoidFunction {
    intercept::get_instance_proc_addr(instance, p_name)
}

#[no_mangle]
pub unsafe extern "system" fn vkGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> PfnVoidFunction {
    intercept::get_device_proc_addr(device, p_name)
}

#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceLayerProperties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    intercept::enumerate_instance_layer_properties(p_property_count, p_properties)
}

#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    intercept::enumerate_instance_extension_properties(p_layer_name, p_property_count, p_properties)
}

#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceLayerProperties(
    physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    intercept::enumerate_device_layer_properties(physical_device, p_property_count, p_properties)
}

#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    intercept::enumerate_device_extension_properties(
        physical_device,
        p_layer_name,
        p_property_count,
        p_properties,
    )
}
