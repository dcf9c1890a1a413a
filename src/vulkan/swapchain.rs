use ash::{extensions::khr, vk, Device, Instance};
use gpu_allocator::vulkan::Allocator;

use super::{
    buffer::Image,
    device::QueueFamilies,
    error::RenderError,
    pipeline::DEPTH_FORMAT,
    surface::Surface,
};

/// Triple-buffer when the surface allows it. A `max_image_count` of zero
/// means the surface imposes no upper bound.
fn clamp_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = 3.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }
    count
}

/// B8G8R8A8_UNORM where available, otherwise whatever the surface lists
/// first.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|format| format.format == vk::Format::B8G8R8A8_UNORM)
        .or_else(|| formats.first())
        .copied()
}

/// Everything `render` needs to record and submit one frame.
pub(super) struct Frame {
    pub(super) image_index: u32,
    pub(super) framebuffer: vk::Framebuffer,
    pub(super) image_available: vk::Semaphore,
    pub(super) render_finished: vk::Semaphore,
    pub(super) in_flight: vk::Fence,
}

pub(super) struct Swapchain {
    loader: khr::Swapchain,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    pub(super) surface_format: vk::SurfaceFormatKHR,
    pub(super) extent: vk::Extent2D,
    depth_image: Image,
    depth_image_view: vk::ImageView,
    image_available: Vec<vk::Semaphore>,
    render_finished: Vec<vk::Semaphore>,
    in_flight: Vec<vk::Fence>,
    current_frame: usize,
    image_count: u32,
}

impl Swapchain {
    pub(super) fn init(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        logical_device: &Device,
        allocator: &mut Allocator,
        surface: &Surface,
        queue_families: &QueueFamilies,
    ) -> Result<Swapchain, RenderError> {
        let capabilities = surface.capabilities(physical_device)?;
        let extent = capabilities.current_extent;
        let surface_format = choose_surface_format(&surface.formats(physical_device)?)
            .ok_or(RenderError::NoSurfaceFormat)?;

        let queue_family_indices = queue_families.unique_indices();
        let sharing_mode = if queue_family_indices.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle)
            .min_image_count(clamp_image_count(&capabilities))
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO);
        let loader = khr::Swapchain::new(instance, logical_device);
        let swapchain = unsafe { loader.create_swapchain(&swapchain_create_info, None) }?;
        let images = unsafe { loader.get_swapchain_images(swapchain) }?;
        let image_count = images.len() as u32;

        let mut image_views = Vec::with_capacity(images.len());
        for image in &images {
            let subresource_range = vk::ImageSubresourceRange::builder()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1);
            let image_view_create_info = vk::ImageViewCreateInfo::builder()
                .image(*image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .subresource_range(*subresource_range);
            let image_view =
                unsafe { logical_device.create_image_view(&image_view_create_info, None) }?;
            image_views.push(image_view);
        }

        let depth_image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let depth_image = Image::new(allocator, logical_device, &depth_image_info, "depth buffer")?;

        let subresource_range = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::DEPTH)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);
        let depth_view_create_info = vk::ImageViewCreateInfo::builder()
            .image(depth_image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(*subresource_range);
        let depth_image_view =
            unsafe { logical_device.create_image_view(&depth_view_create_info, None) }?;

        let mut image_available = Vec::with_capacity(images.len());
        let mut render_finished = Vec::with_capacity(images.len());
        let mut in_flight = Vec::with_capacity(images.len());
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        for _ in 0..image_count {
            image_available
                .push(unsafe { logical_device.create_semaphore(&semaphore_info, None) }?);
            render_finished
                .push(unsafe { logical_device.create_semaphore(&semaphore_info, None) }?);
            in_flight.push(unsafe { logical_device.create_fence(&fence_info, None) }?);
        }

        Ok(Swapchain {
            loader,
            swapchain,
            image_views,
            framebuffers: vec![],
            surface_format,
            extent,
            depth_image,
            depth_image_view,
            image_available,
            render_finished,
            in_flight,
            current_frame: 0,
            image_count,
        })
    }

    pub(super) fn create_framebuffers(
        &mut self,
        logical_device: &Device,
        render_pass: vk::RenderPass,
    ) -> Result<(), RenderError> {
        for image_view in &self.image_views {
            let attachments = [*image_view, self.depth_image_view];
            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);
            let framebuffer =
                unsafe { logical_device.create_framebuffer(&framebuffer_info, None) }?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    pub(super) fn image_count(&self) -> usize {
        self.image_count as usize
    }

    /// Advance to the next frame slot, wait until its previous submission
    /// has drained, and acquire a swapchain image for it.
    pub(super) fn next_frame(&mut self, logical_device: &Device) -> Result<Frame, RenderError> {
        self.current_frame = (self.current_frame + 1) % self.image_count as usize;
        let in_flight = self.in_flight[self.current_frame];

        unsafe {
            logical_device.wait_for_fences(&[in_flight], true, u64::MAX)?;
        }

        let (image_index, _suboptimal) = unsafe {
            self.loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available[self.current_frame],
                vk::Fence::null(),
            )
        }?;

        unsafe {
            logical_device.reset_fences(&[in_flight])?;
        }

        Ok(Frame {
            image_index,
            framebuffer: self.framebuffers[image_index as usize],
            image_available: self.image_available[self.current_frame],
            render_finished: self.render_finished[self.current_frame],
            in_flight,
        })
    }

    pub(super) fn present(
        &self,
        present_queue: vk::Queue,
        frame: &Frame,
    ) -> Result<(), RenderError> {
        let wait_semaphores = [frame.render_finished];
        let swapchains = [self.swapchain];
        let image_indices = [frame.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        unsafe {
            self.loader.queue_present(present_queue, &present_info)?;
        }
        Ok(())
    }

    pub(super) unsafe fn cleanup(&mut self, logical_device: &Device, allocator: &mut Allocator) {
        for fence in &self.in_flight {
            logical_device.destroy_fence(*fence, None);
        }
        for semaphore in &self.render_finished {
            logical_device.destroy_semaphore(*semaphore, None);
        }
        for semaphore in &self.image_available {
            logical_device.destroy_semaphore(*semaphore, None);
        }
        for framebuffer in &self.framebuffers {
            logical_device.destroy_framebuffer(*framebuffer, None);
        }
        logical_device.destroy_image_view(self.depth_image_view, None);
        self.depth_image.cleanup(allocator, logical_device);
        for image_view in &self.image_views {
            logical_device.destroy_image_view(*image_view, None);
        }
        self.loader.destroy_swapchain(self.swapchain, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn image_count_prefers_triple_buffering() {
        assert_eq!(clamp_image_count(&capabilities(2, 8)), 3);
    }

    #[test]
    fn image_count_respects_surface_bounds() {
        assert_eq!(clamp_image_count(&capabilities(4, 8)), 4);
        assert_eq!(clamp_image_count(&capabilities(2, 2)), 2);
        // max == 0 means unbounded
        assert_eq!(clamp_image_count(&capabilities(2, 0)), 3);
    }

    #[test]
    fn surface_format_prefers_bgra_unorm() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::B8G8R8A8_UNORM)
        );
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::R8G8B8A8_SRGB)
        );
        assert!(choose_surface_format(&[]).is_none());
    }
}
