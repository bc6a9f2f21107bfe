//! Vulkan-backed frame orchestrator.
//!
//! [`Renderer`] owns the whole GPU object graph and implements
//! [`FrameDriver`], so [`run_tick`] drives its frames through the same state
//! machine the mock tests exercise.
//!
//! # Resource Destruction Order
//!
//! Vulkan resources must be destroyed in reverse creation order:
//! 1. Wait for all GPU work to complete
//! 2. Frame ring and per-frame uniform buffers
//! 3. Geometry buffers, texture, upload pool
//! 4. Pipeline, descriptor resources
//! 5. Draw and depth images
//! 6. Swapchain, surface
//! 7. Device, instance
//!
//! `ManuallyDrop` pins that order explicitly in `Drop`.

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use helio_assets::{MeshData, TextureData};
use helio_core::Timer;
use helio_platform::{Surface, Window};
use helio_rhi::barrier;
use helio_rhi::buffer::{Buffer, BufferUsage};
use helio_rhi::command::CommandPool;
use helio_rhi::descriptor::{
    combined_image_sampler_binding, uniform_buffer_binding, update_descriptor_sets,
    DescriptorPool, DescriptorSetLayout,
};
use helio_rhi::device::Device;
use helio_rhi::image::{Image, DEPTH_FORMAT, DRAW_IMAGE_FORMAT};
use helio_rhi::instance::Instance;
use helio_rhi::physical_device::select_physical_device;
use helio_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use helio_rhi::shader::{Shader, ShaderStage};
use helio_rhi::swapchain::Swapchain;
use helio_rhi::texture::Texture;
use helio_rhi::upload::upload_to_buffer;
use helio_rhi::vertex::Vertex;
use helio_rhi::{RhiError, RhiResult};

use crate::frame::FrameRing;
use crate::tick::{run_tick, Acquire, FrameDriver, PresentState, TickOutcome};
use crate::uniforms::SceneUniform;
use crate::FRAMES_IN_FLIGHT;

/// Precompiled shader locations, relative to the working directory.
const VERTEX_SHADER_PATH: &str = "shaders/mesh.vert.spv";
const FRAGMENT_SHADER_PATH: &str = "shaders/mesh.frag.spv";

/// Background clear color for the draw image.
const CLEAR_COLOR: [f32; 4] = [0.05, 0.05, 0.08, 1.0];

/// Per-slot uniform buffer and its descriptor set.
struct FrameUniform {
    buffer: Buffer,
    descriptor_set: vk::DescriptorSet,
}

/// Owns all Vulkan resources and renders frames.
///
/// Rendering goes through an internal color target rather than straight
/// into the swapchain: each frame draws into `draw_image`, then blits the
/// result into the acquired swapchain image. The blit absorbs any
/// size/format difference between the two.
pub struct Renderer {
    instance: ManuallyDrop<Instance>,
    device: ManuallyDrop<Arc<Device>>,
    surface: ManuallyDrop<Surface>,
    swapchain: ManuallyDrop<Swapchain>,

    /// Internal color render target, blitted into the swapchain each frame.
    draw_image: ManuallyDrop<Image>,
    depth_image: ManuallyDrop<Image>,

    descriptor_set_layout: ManuallyDrop<DescriptorSetLayout>,
    descriptor_pool: ManuallyDrop<DescriptorPool>,
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    pipeline: ManuallyDrop<Pipeline>,

    /// Transient pool for one-shot upload submissions.
    upload_pool: ManuallyDrop<CommandPool>,
    vertex_buffer: ManuallyDrop<Buffer>,
    index_buffer: ManuallyDrop<Buffer>,
    index_count: u32,
    texture: ManuallyDrop<Texture>,

    frame_uniforms: ManuallyDrop<Vec<FrameUniform>>,
    frame_ring: ManuallyDrop<FrameRing>,

    timer: Timer,
    framebuffer_resized: bool,
    width: u32,
    height: u32,
}

impl Renderer {
    /// Creates a renderer for the given window and uploads the scene data.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal at startup and propagates to the caller.
    pub fn new(window: &Window, mesh: &MeshData, texture_data: &TextureData) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();

        info!("Initializing renderer ({}x{})", width, height);

        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::Surface(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        let draw_image = Image::color_target(device.clone(), width, height)?;
        let depth_image = Image::depth_target(device.clone(), width, height)?;

        // Binding 0: per-frame transforms, binding 1: texture sampler
        let bindings = [
            uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX),
            combined_image_sampler_binding(1, vk::ShaderStageFlags::FRAGMENT),
        ];
        let descriptor_set_layout = DescriptorSetLayout::new(device.clone(), &bindings)?;

        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(FRAMES_IN_FLIGHT as u32),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(FRAMES_IN_FLIGHT as u32),
        ];
        let descriptor_pool =
            DescriptorPool::new(device.clone(), FRAMES_IN_FLIGHT as u32, &pool_sizes)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .expect("validated at device selection");
        let upload_pool = CommandPool::new_transient(device.clone(), graphics_family)?;

        let vertex_buffer = upload_to_buffer(&upload_pool, BufferUsage::Vertex, mesh.vertex_bytes())?;
        let index_buffer = upload_to_buffer(&upload_pool, BufferUsage::Index, mesh.index_bytes())?;
        let index_count = mesh.index_count();

        let texture = Texture::from_rgba8(
            device.clone(),
            &upload_pool,
            &texture_data.pixels,
            texture_data.width,
            texture_data.height,
        )?;

        let (pipeline, pipeline_layout) =
            Self::create_pipeline(device.clone(), &descriptor_set_layout)?;

        let frame_uniforms =
            Self::create_frame_uniforms(&device, &descriptor_pool, &descriptor_set_layout, &texture)?;

        let frame_ring = FrameRing::new(device.clone())?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, {} indices",
            swapchain.image_count(),
            FRAMES_IN_FLIGHT,
            index_count
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            draw_image: ManuallyDrop::new(draw_image),
            depth_image: ManuallyDrop::new(depth_image),
            descriptor_set_layout: ManuallyDrop::new(descriptor_set_layout),
            descriptor_pool: ManuallyDrop::new(descriptor_pool),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            pipeline: ManuallyDrop::new(pipeline),
            upload_pool: ManuallyDrop::new(upload_pool),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            index_buffer: ManuallyDrop::new(index_buffer),
            index_count,
            texture: ManuallyDrop::new(texture),
            frame_uniforms: ManuallyDrop::new(frame_uniforms),
            frame_ring: ManuallyDrop::new(frame_ring),
            timer: Timer::new(),
            framebuffer_resized: false,
            width,
            height,
        })
    }

    /// Creates the mesh pipeline rendering into the internal draw image.
    fn create_pipeline(
        device: Arc<Device>,
        descriptor_set_layout: &DescriptorSetLayout,
    ) -> RhiResult<(Pipeline, PipelineLayout)> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERTEX_SHADER_PATH),
            ShaderStage::Vertex,
            "main",
        )?;

        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAGMENT_SHADER_PATH),
            ShaderStage::Fragment,
            "main",
        )?;

        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()], &[])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .color_attachment_format(DRAW_IMAGE_FORMAT)
            .depth_attachment_format(DEPTH_FORMAT)
            .build(device, &pipeline_layout)?;

        Ok((pipeline, pipeline_layout))
    }

    /// Creates one uniform buffer + descriptor set per frame slot.
    fn create_frame_uniforms(
        device: &Arc<Device>,
        descriptor_pool: &DescriptorPool,
        descriptor_set_layout: &DescriptorSetLayout,
        texture: &Texture,
    ) -> RhiResult<Vec<FrameUniform>> {
        let layouts: Vec<_> = (0..FRAMES_IN_FLIGHT)
            .map(|_| descriptor_set_layout.handle())
            .collect();
        let descriptor_sets = descriptor_pool.allocate(&layouts)?;

        let mut frames = Vec::with_capacity(FRAMES_IN_FLIGHT);

        for (i, &descriptor_set) in descriptor_sets.iter().enumerate() {
            let buffer = Buffer::new(
                device.clone(),
                BufferUsage::Uniform,
                SceneUniform::SIZE as vk::DeviceSize,
            )?;

            let buffer_infos = [vk::DescriptorBufferInfo::default()
                .buffer(buffer.handle())
                .offset(0)
                .range(SceneUniform::SIZE as vk::DeviceSize)];

            let image_infos = [vk::DescriptorImageInfo::default()
                .sampler(texture.sampler())
                .image_view(texture.view())
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];

            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(0)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_infos),
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(1)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_infos),
            ];
            update_descriptor_sets(device, &writes);

            debug!("Created uniform resources for frame slot {}", i);

            frames.push(FrameUniform {
                buffer,
                descriptor_set,
            });
        }

        Ok(frames)
    }

    /// Notifies the renderer that the window size changed.
    ///
    /// The swapchain rebuild happens on the next tick; a zero-sized window
    /// parks the loop until a usable size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            debug!(
                "Resize: {}x{} -> {}x{}",
                self.width, self.height, width, height
            );
            self.width = width;
            self.height = height;
            self.framebuffer_resized = true;
        }
    }

    /// Renders one frame through the tick state machine.
    ///
    /// # Errors
    ///
    /// Returns an error on any unexpected Vulkan failure; the caller treats
    /// these as fatal.
    pub fn render_frame(&mut self) -> RhiResult<TickOutcome> {
        let rebuild_requested = self.framebuffer_resized;
        run_tick(self, rebuild_requested)
    }

    /// Returns the frame counter.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_ring.frame_number()
    }

    /// Writes this frame's transforms into the current slot's uniform buffer.
    fn update_uniforms(&self) -> RhiResult<()> {
        let aspect_ratio = self.width as f32 / self.height as f32;
        let uniform = SceneUniform::spinning(self.timer.elapsed_secs(), aspect_ratio);

        let slot_index = self.frame_ring.slot_index();
        self.frame_uniforms[slot_index]
            .buffer
            .write_data(0, uniform.as_bytes())
    }

    /// Records the frame's commands into the current slot's buffer.
    fn record_commands(&self, image_index: u32) -> RhiResult<()> {
        let slot = self.frame_ring.current();
        let cmd = slot.command_buffer();
        let draw_extent = self.draw_image.extent();

        cmd.begin()?;

        // Attachments start the frame with undefined contents.
        barrier::transition(
            cmd,
            self.draw_image.handle(),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        )?;
        barrier::transition(
            cmd,
            self.depth_image.handle(),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        )?;

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.draw_image.view())
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            });

        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.depth_image.view())
            .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });

        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: draw_extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment))
            .depth_attachment(&depth_attachment);

        cmd.begin_rendering(&rendering_info);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: draw_extent.width as f32,
            height: draw_extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        cmd.set_viewport(&viewport);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: draw_extent,
        };
        cmd.set_scissor(&scissor);

        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());

        let slot_index = self.frame_ring.slot_index();
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout.handle(),
            0,
            &[self.frame_uniforms[slot_index].descriptor_set],
            &[],
        );

        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        cmd.bind_index_buffer(self.index_buffer.handle(), 0, vk::IndexType::UINT32);

        cmd.draw_indexed(self.index_count, 1, 0, 0, 0);

        cmd.end_rendering();

        // Blit the rendered image into the acquired swapchain image.
        barrier::transition(
            cmd,
            self.draw_image.handle(),
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        )?;

        let swapchain_image = self.swapchain.image(image_index as usize);
        barrier::transition(
            cmd,
            swapchain_image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;

        barrier::copy_image_to_image(
            cmd,
            self.draw_image.handle(),
            swapchain_image,
            draw_extent,
            self.swapchain.extent(),
        );

        barrier::transition(
            cmd,
            swapchain_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        )?;

        cmd.end()?;

        Ok(())
    }
}

impl FrameDriver for Renderer {
    fn surface_extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn wait_for_frame(&mut self) -> RhiResult<()> {
        self.frame_ring.current().render_fence().wait(u64::MAX)
    }

    fn acquire_image(&mut self) -> RhiResult<Acquire> {
        let semaphore = self.frame_ring.current().acquire_semaphore().handle();

        match self.swapchain.acquire_next_image(semaphore) {
            Ok((image_index, suboptimal)) => Ok(Acquire::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date during acquire");
                Ok(Acquire::OutOfDate)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reset_frame(&mut self) -> RhiResult<()> {
        let slot = self.frame_ring.current();
        slot.render_fence().reset()?;
        slot.command_buffer().reset()?;
        Ok(())
    }

    fn record(&mut self, image_index: u32) -> RhiResult<()> {
        self.update_uniforms()?;
        self.record_commands(image_index)
    }

    fn submit(&mut self) -> RhiResult<()> {
        let slot = self.frame_ring.current();

        let wait_semaphores = [slot.acquire_semaphore().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_semaphore().handle()];
        let command_buffers = [slot.command_buffer().handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.handle().queue_submit(
                self.device.graphics_queue(),
                &[submit_info],
                slot.render_fence().handle(),
            )?;
        }

        Ok(())
    }

    fn present(&mut self, image_index: u32) -> RhiResult<PresentState> {
        let slot = self.frame_ring.current();

        match self.swapchain.present(
            self.device.present_queue(),
            image_index,
            slot.render_semaphore().handle(),
        ) {
            Ok(suboptimal) => Ok(PresentState::Presented { suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date during present");
                Ok(PresentState::OutOfDate)
            }
            Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentState::Presented { suboptimal: true }),
            Err(e) => Err(e.into()),
        }
    }

    fn rebuild_swapchain(&mut self) -> RhiResult<()> {
        self.frame_ring.wait_all()?;

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
        )?;

        // The draw and depth targets track the window size; build the
        // replacements before dropping the old ones so a failure here
        // leaves the renderer in a droppable state.
        let new_draw = Image::color_target((*self.device).clone(), self.width, self.height)?;
        let new_depth = Image::depth_target((*self.device).clone(), self.width, self.height)?;
        unsafe {
            ManuallyDrop::drop(&mut self.draw_image);
            ManuallyDrop::drop(&mut self.depth_image);
        }
        self.draw_image = ManuallyDrop::new(new_draw);
        self.depth_image = ManuallyDrop::new(new_depth);

        // An acquire semaphore may be left signaled by an image that never
        // reached present.
        self.frame_ring.reset_semaphores()?;

        self.framebuffer_resized = false;
        Ok(())
    }

    fn advance(&mut self) {
        self.frame_ring.advance();
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during drop: {:?}", e);
        }

        unsafe {
            ManuallyDrop::drop(&mut self.frame_ring);
            ManuallyDrop::drop(&mut self.frame_uniforms);
            ManuallyDrop::drop(&mut self.texture);
            ManuallyDrop::drop(&mut self.index_buffer);
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.upload_pool);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.descriptor_pool);
            ManuallyDrop::drop(&mut self.descriptor_set_layout);
            ManuallyDrop::drop(&mut self.depth_image);
            ManuallyDrop::drop(&mut self.draw_image);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
