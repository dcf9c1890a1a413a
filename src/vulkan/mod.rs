use std::ffi::CString;

use ash::{extensions::ext::DebugUtils, vk, Device, Entry, Instance};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use log::info;
use winit::window::Window;

mod buffer;
mod cube;
mod debug;
mod device;
mod error;
mod pipeline;
mod surface;
mod swapchain;

use buffer::Buffer;
use cube::{Spin, Transforms, Vertex, INDICES, VERTICES};
use debug::DebugMessenger;
use device::{QueueFamilies, Queues};
pub use error::RenderError;
use pipeline::Pipeline;
use surface::Surface;
use swapchain::{Frame, Swapchain};

/// The whole explicit-Vulkan rendering stack for the cube, created in the
/// order the API mandates and torn down in reverse.
pub struct Graphics {
    _entry: Entry,
    instance: Instance,
    debug: Option<DebugMessenger>,
    surface: Surface,
    device: Device,
    queues: Queues,
    allocator: Option<Allocator>,
    swapchain: Swapchain,
    render_pass: vk::RenderPass,
    pipeline: Pipeline,
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    descriptor_pool: vk::DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<Buffer<Transforms>>,
    vertex_buffer: Buffer<Vertex>,
    index_buffer: Buffer<u32>,
    transforms: Transforms,
    spin: Spin,
}

impl Graphics {
    pub fn new(window: &Window) -> Result<Graphics, RenderError> {
        let entry = unsafe { Entry::load() }?;

        let instance = create_instance(&entry, window)?;
        let debug = if cfg!(debug_assertions) {
            Some(DebugMessenger::new(
                &entry,
                &instance,
                DebugMessenger::create_info(),
            )?)
        } else {
            None
        };

        let surface = Surface::new(window, &entry, &instance)?;
        let (physical_device, _properties) = device::pick_physical_device(&instance)?;
        let queue_families = QueueFamilies::find(&instance, physical_device, &surface)?;
        let (device, queues) =
            device::create_logical_device(&instance, physical_device, &queue_families)?;

        let mut allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
        })?;

        let mut swapchain = Swapchain::init(
            &instance,
            physical_device,
            &device,
            &mut allocator,
            &surface,
            &queue_families,
        )?;
        let render_pass = pipeline::create_render_pass(&device, swapchain.surface_format.format)?;
        swapchain.create_framebuffers(&device, render_pass)?;
        let pipeline = Pipeline::init(&device, render_pass)?;

        let command_pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(queue_families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { device.create_command_pool(&command_pool_info, None) }?;

        let command_buffer_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(swapchain.image_count() as u32);
        let command_buffers = unsafe { device.allocate_command_buffers(&command_buffer_info) }?;

        let transforms = Transforms::new(
            swapchain.extent.width as f32 / swapchain.extent.height as f32,
        );

        let mut uniform_buffers = Vec::with_capacity(swapchain.image_count());
        for image_index in 0..swapchain.image_count() {
            let mut uniform_buffer = Buffer::new(
                &mut allocator,
                &device,
                1,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                &format!("transforms {}", image_index),
            )?;
            uniform_buffer.fill(&[transforms])?;
            uniform_buffers.push(uniform_buffer);
        }

        let (descriptor_pool, descriptor_sets) = create_descriptor_sets(
            &device,
            pipeline.descriptor_set_layout,
            &uniform_buffers,
        )?;

        let mut vertex_buffer = Buffer::new(
            &mut allocator,
            &device,
            VERTICES.len() as u64,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "cube vertices",
        )?;
        vertex_buffer.fill(&VERTICES)?;

        let mut index_buffer = Buffer::new(
            &mut allocator,
            &device,
            INDICES.len() as u64,
            vk::BufferUsageFlags::INDEX_BUFFER,
            "cube indices",
        )?;
        index_buffer.fill(&INDICES)?;

        info!(
            "vulkan initialised: {} swapchain images at {}x{}",
            swapchain.image_count(),
            swapchain.extent.width,
            swapchain.extent.height
        );

        Ok(Graphics {
            _entry: entry,
            instance,
            debug,
            surface,
            device,
            queues,
            allocator: Some(allocator),
            swapchain,
            render_pass,
            pipeline,
            command_pool,
            command_buffers,
            descriptor_pool,
            descriptor_sets,
            uniform_buffers,
            vertex_buffer,
            index_buffer,
            transforms,
            spin: Spin::new(),
        })
    }

    /// Pause or resume the spin.
    pub fn toggle_spin(&mut self) {
        self.spin.toggle();
    }

    /// Acquire, record, submit, present. Any error aborts the render loop.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let frame = self.swapchain.next_frame(&self.device)?;

        self.transforms.model = self.spin.tick();
        self.uniform_buffers[frame.image_index as usize].fill(&[self.transforms])?;

        self.record_commands(&frame)?;

        let wait_semaphores = [frame.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffers[frame.image_index as usize]];
        let signal_semaphores = [frame.render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);
        unsafe {
            self.device
                .queue_submit(self.queues.graphics, &[*submit_info], frame.in_flight)?;
        }

        self.swapchain.present(self.queues.present, &frame)
    }

    fn record_commands(&self, frame: &Frame) -> Result<(), RenderError> {
        let command_buffer = self.command_buffers[frame.image_index as usize];
        let begin_info = vk::CommandBufferBeginInfo::builder();
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(frame.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            })
            .clear_values(&clear_values);
        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.swapchain.extent.width as f32,
            height: self.swapchain.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.swapchain.extent,
        }];

        unsafe {
            self.device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            self.device
                .begin_command_buffer(command_buffer, &begin_info)?;
            self.device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
            self.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline,
            );
            self.device.cmd_set_viewport(command_buffer, 0, &viewports);
            self.device.cmd_set_scissor(command_buffer, 0, &scissors);
            self.device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[self.vertex_buffer.buffer],
                &[0],
            );
            self.device.cmd_bind_index_buffer(
                command_buffer,
                self.index_buffer.buffer,
                0,
                vk::IndexType::UINT32,
            );
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout,
                0,
                &[self.descriptor_sets[frame.image_index as usize]],
                &[],
            );
            self.device
                .cmd_draw_indexed(command_buffer, INDICES.len() as u32, 1, 0, 0, 0);
            self.device.cmd_end_render_pass(command_buffer);
            self.device.end_command_buffer(command_buffer)?;
        }
        Ok(())
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        unsafe {
            // Nothing may be destroyed while the GPU still reads it.
            let _ = self.device.device_wait_idle();

            if let Some(mut allocator) = self.allocator.take() {
                self.index_buffer.cleanup(&mut allocator, &self.device);
                self.vertex_buffer.cleanup(&mut allocator, &self.device);
                for uniform_buffer in &mut self.uniform_buffers {
                    uniform_buffer.cleanup(&mut allocator, &self.device);
                }
                self.swapchain.cleanup(&self.device, &mut allocator);
                // The allocator itself is dropped here, while the device is
                // still alive.
            }
            self.device
                .destroy_descriptor_pool(self.descriptor_pool, None);
            self.device.destroy_command_pool(self.command_pool, None);
            self.pipeline.cleanup(&self.device);
            self.device.destroy_render_pass(self.render_pass, None);
            self.device.destroy_device(None);
            self.surface.destroy();
            if let Some(debug) = &mut self.debug {
                debug.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn create_instance(entry: &Entry, window: &Window) -> Result<Instance, RenderError> {
    let app_name = CString::new(env!("CARGO_PKG_NAME")).unwrap();
    let app_version = vk::make_api_version(
        0,
        env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap(),
        env!("CARGO_PKG_VERSION_MINOR").parse::<u32>().unwrap(),
        env!("CARGO_PKG_VERSION_PATCH").parse::<u32>().unwrap(),
    );
    let app_info = vk::ApplicationInfo::builder()
        // Everything used here was already in 1.0, keep the floor low.
        .api_version(vk::make_api_version(0, 1, 0, 0))
        .application_name(&app_name)
        .application_version(app_version)
        .engine_name(&app_name)
        .engine_version(app_version);

    let layer_name_pointers = device::layer_name_pointers();
    let mut extension_name_pointers = Surface::required_extensions(window)?;
    if cfg!(debug_assertions) {
        extension_name_pointers.push(DebugUtils::name().as_ptr());
    }

    let mut debug_create_info = DebugMessenger::create_info();
    let mut instance_create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_layer_names(&layer_name_pointers)
        .enabled_extension_names(&extension_name_pointers);
    if cfg!(debug_assertions) {
        // Covers instance creation itself, before the messenger exists.
        instance_create_info = instance_create_info.push_next(&mut debug_create_info);
    }

    let instance = unsafe { entry.create_instance(&instance_create_info, None) }?;
    Ok(instance)
}

fn create_descriptor_sets(
    device: &Device,
    layout: vk::DescriptorSetLayout,
    uniform_buffers: &[Buffer<Transforms>],
) -> Result<(vk::DescriptorPool, Vec<vk::DescriptorSet>), RenderError> {
    let count = uniform_buffers.len() as u32;
    let pool_sizes = [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: count,
    }];
    let pool_info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(&pool_sizes)
        .max_sets(count);
    let descriptor_pool = unsafe { device.create_descriptor_pool(&pool_info, None) }?;

    let layouts = vec![layout; uniform_buffers.len()];
    let allocate_info = vk::DescriptorSetAllocateInfo::builder()
        .descriptor_pool(descriptor_pool)
        .set_layouts(&layouts);
    let descriptor_sets = unsafe { device.allocate_descriptor_sets(&allocate_info) }?;

    for (descriptor_set, uniform_buffer) in descriptor_sets.iter().zip(uniform_buffers) {
        let buffer_infos = [vk::DescriptorBufferInfo {
            buffer: uniform_buffer.buffer,
            offset: 0,
            range: std::mem::size_of::<Transforms>() as u64,
        }];
        let writes = [vk::WriteDescriptorSet::builder()
            .dst_set(*descriptor_set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_infos)
            .build()];
        unsafe { device.update_descriptor_sets(&writes, &[]) };
    }

    Ok((descriptor_pool, descriptor_sets))
}
