use std::ffi::CStr;
use std::os::raw::c_char;

use ash::{extensions::khr, vk, Device, Instance};
use log::info;

use super::{error::RenderError, surface::Surface};

pub(super) fn validation_layer_name() -> &'static CStr {
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") }
}

pub(super) fn layer_name_pointers() -> Vec<*const c_char> {
    if cfg!(debug_assertions) {
        vec![validation_layer_name().as_ptr()]
    } else {
        vec![]
    }
}

/// Prefer a discrete GPU, otherwise settle for whatever is enumerated first.
pub(super) fn pick_physical_device(
    instance: &Instance,
) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceProperties), RenderError> {
    let physical_devices = unsafe { instance.enumerate_physical_devices() }?;

    let mut chosen = None;
    for device in physical_devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        match chosen {
            None => chosen = Some((device, properties)),
            Some((_, current)) if current.device_type != vk::PhysicalDeviceType::DISCRETE_GPU
                && properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU =>
            {
                chosen = Some((device, properties))
            }
            Some(_) => {}
        }
    }

    let (device, properties) = chosen.ok_or(RenderError::NoSuitableGpu)?;
    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
    info!("rendering on {:?}", name);
    Ok((device, properties))
}

pub(super) struct QueueFamilies {
    pub(super) graphics: u32,
    pub(super) present: u32,
}

impl QueueFamilies {
    pub(super) fn find(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Result<QueueFamilies, RenderError> {
        let family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let mut graphics = None;
        let mut present = None;
        for (index, family) in family_properties.iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let index = index as u32;
            let supports_present = surface.supports_queue_family(physical_device, index)?;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                if supports_present {
                    // One family for both keeps submission and presentation
                    // on a single queue.
                    graphics = Some(index);
                    present = Some(index);
                    break;
                }
                if graphics.is_none() {
                    graphics = Some(index);
                }
            }
            if present.is_none() && supports_present {
                present = Some(index);
            }
        }

        Ok(QueueFamilies {
            graphics: graphics.ok_or(RenderError::NoGraphicsQueue)?,
            present: present.ok_or(RenderError::NoPresentQueue)?,
        })
    }

    pub(super) fn unique_indices(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

pub(super) struct Queues {
    pub(super) graphics: vk::Queue,
    pub(super) present: vk::Queue,
}

pub(super) fn create_logical_device(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: &QueueFamilies,
) -> Result<(Device, Queues), RenderError> {
    let layer_name_pointers = layer_name_pointers();
    let device_extension_name_pointers: Vec<*const c_char> = vec![khr::Swapchain::name().as_ptr()];

    let priorities = [1.0f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
        .unique_indices()
        .iter()
        .map(|index| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(*index)
                .queue_priorities(&priorities)
                .build()
        })
        .collect();

    let device_create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&device_extension_name_pointers)
        .enabled_layer_names(&layer_name_pointers);

    let logical_device =
        unsafe { instance.create_device(physical_device, &device_create_info, None) }?;

    let graphics_queue = unsafe { logical_device.get_device_queue(queue_families.graphics, 0) };
    let present_queue = unsafe { logical_device.get_device_queue(queue_families.present, 0) };

    Ok((
        logical_device,
        Queues {
            graphics: graphics_queue,
            present: present_queue,
        },
    ))
}
