use std::os::raw::c_char;

use ash::{extensions::khr, vk, Entry, Instance};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use winit::window::Window;

pub(super) struct Surface {
    loader: khr::Surface,
    pub(super) handle: vk::SurfaceKHR,
}

impl Surface {
    pub(super) fn new(
        window: &Window,
        entry: &Entry,
        instance: &Instance,
    ) -> Result<Surface, vk::Result> {
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }?;
        let loader = khr::Surface::new(entry, instance);
        Ok(Surface { loader, handle })
    }

    /// Instance extensions the window system needs, on top of our own.
    pub(super) fn required_extensions(window: &Window) -> Result<Vec<*const c_char>, vk::Result> {
        let extensions =
            ash_window::enumerate_required_extensions(window.raw_display_handle())?;
        Ok(extensions.to_vec())
    }

    pub(super) fn supports_queue_family(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool, vk::Result> {
        unsafe {
            self.loader.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                self.handle,
            )
        }
    }

    pub(super) fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result> {
        unsafe {
            self.loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)
        }
    }

    pub(super) fn formats(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::Result> {
        unsafe {
            self.loader
                .get_physical_device_surface_formats(physical_device, self.handle)
        }
    }

    pub(super) unsafe fn destroy(&mut self) {
        self.loader.destroy_surface(self.handle, None);
    }
}
