use std::{marker::PhantomData, mem::size_of};

use ash::{vk, Device};
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator},
    MemoryLocation,
};

use super::error::RenderError;

/// A typed buffer backed by persistently-mapped host-visible memory.
pub(super) struct Buffer<T> {
    pub(super) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    phantom: PhantomData<T>,
}

impl<T> Buffer<T> {
    pub(super) fn new(
        allocator: &mut Allocator,
        logical_device: &Device,
        count: u64,
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Buffer<T>, RenderError> {
        let buffer_create_info = vk::BufferCreateInfo::builder()
            .size(count * (size_of::<T>() as u64))
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { logical_device.create_buffer(&buffer_create_info, None) }?;

        let requirements = unsafe { logical_device.get_buffer_memory_requirements(buffer) };
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        unsafe {
            logical_device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?
        };
        Ok(Buffer {
            buffer,
            allocation: Some(allocation),
            phantom: PhantomData,
        })
    }

    pub(super) fn fill(&mut self, data: &[T]) -> Result<(), RenderError> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or(RenderError::Allocation(
                gpu_allocator::AllocationError::Internal("buffer already freed".to_string()),
            ))?;
        let mapping = allocation
            .mapped_ptr()
            .ok_or(RenderError::Allocation(
                gpu_allocator::AllocationError::Internal("buffer is not mapped".to_string()),
            ))?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapping.cast().as_ptr(), data.len());
        }
        Ok(())
    }

    pub(super) unsafe fn cleanup(&mut self, allocator: &mut Allocator, logical_device: &Device) {
        logical_device.destroy_buffer(self.buffer, None);
        if let Some(allocation) = self.allocation.take() {
            let _ = allocator.free(allocation);
        }
    }
}

/// A device-local image, only used for the depth attachment.
pub(super) struct Image {
    pub(super) image: vk::Image,
    allocation: Option<Allocation>,
}

impl Image {
    pub(super) fn new(
        allocator: &mut Allocator,
        logical_device: &Device,
        create_info: &vk::ImageCreateInfo,
        name: &str,
    ) -> Result<Image, RenderError> {
        let image = unsafe { logical_device.create_image(create_info, None) }?;

        let requirements = unsafe { logical_device.get_image_memory_requirements(image) };
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        unsafe {
            logical_device.bind_image_memory(image, allocation.memory(), allocation.offset())?
        };
        Ok(Image {
            image,
            allocation: Some(allocation),
        })
    }

    pub(super) unsafe fn cleanup(&mut self, allocator: &mut Allocator, logical_device: &Device) {
        logical_device.destroy_image(self.image, None);
        if let Some(allocation) = self.allocation.take() {
            let _ = allocator.free(allocation);
        }
    }
}
