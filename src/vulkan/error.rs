use ash::{vk, LoadingError};
use gpu_allocator::AllocationError;

#[derive(Debug)]
pub enum RenderError {
    Vk(vk::Result),
    Loading(LoadingError),
    Allocation(AllocationError),
    /// No Vulkan-capable adapter was enumerated.
    NoSuitableGpu,
    /// No queue family can both draw and be created on this device.
    NoGraphicsQueue,
    /// No queue family can present to the window surface.
    NoPresentQueue,
    /// The surface reported an empty format list.
    NoSurfaceFormat,
}

impl From<vk::Result> for RenderError {
    fn from(value: vk::Result) -> Self {
        RenderError::Vk(value)
    }
}

impl From<LoadingError> for RenderError {
    fn from(value: LoadingError) -> Self {
        RenderError::Loading(value)
    }
}

impl From<AllocationError> for RenderError {
    fn from(value: AllocationError) -> Self {
        RenderError::Allocation(value)
    }
}

impl From<(Vec<vk::Pipeline>, vk::Result)> for RenderError {
    fn from(value: (Vec<vk::Pipeline>, vk::Result)) -> Self {
        RenderError::Vk(value.1)
    }
}
