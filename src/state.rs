use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, event::*, window::Window};

use crate::camera::{CameraController, Eye, StereoCamera};
use crate::config::{self, ContextSettings};
use crate::cube::{self, Cube};
use crate::frame::{self, EyePass, EyeUniform};
use crate::shader::{self, ShaderBindings, ShaderReflection};
use crate::texture::{DecodedImage, Texture};
use crate::vertex::{self, Attribute, VertexLayouts};

/// Multisampled color and depth attachments matching the current target size.
struct FrameTargets {
    width: u32,
    height: u32,
    msaa: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
}

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Color format of whatever the frame is rendered into.
    pub format: wgpu::TextureFormat,
    pub settings: ContextSettings,
    sample_count: u32,
    /// Whether the adapter can clamp samplers to a border color.
    pub clamp_to_border: bool,
    targets: FrameTargets,
}

/// The window's swap chain. Kept apart from `GpuContext` so the renderer can draw into any texture.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    fn configure(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(device, &self.config);
    }
}

impl GpuContext {
    pub async fn new(window: Arc<Window>, settings: ContextSettings) -> anyhow::Result<(Self, WindowSurface)> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone()).context("failed to create surface")?;
        let adapter = Self::request_adapter(&instance, Some(&surface)).await?;

        let mut config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or_else(|| anyhow!("surface is not supported by the adapter"))?;
        config.present_mode = wgpu::PresentMode::Fifo;

        let ctx = Self::open(&adapter, settings, config.format, config.width, config.height).await?;
        surface.configure(&ctx.device, &config);
        Ok((ctx, WindowSurface { surface, config }))
    }

    /// A context with no window, rendering into textures of `format`.
    #[cfg(test)]
    pub async fn headless(settings: ContextSettings, format: wgpu::TextureFormat, width: u32, height: u32) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = Self::request_adapter(&instance, None).await?;
        Self::open(&adapter, settings, format, width, height).await
    }

    async fn request_adapter(instance: &wgpu::Instance, surface: Option<&wgpu::Surface<'_>>) -> anyhow::Result<wgpu::Adapter> {
        let options = |fallback| wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: fallback,
        };
        match instance.request_adapter(&options(false)).await {
            Some(adapter) => Ok(adapter),
            None => {
                log::error!("No hardware adapter available, falling back to a software adapter");
                instance.request_adapter(&options(true)).await.ok_or_else(|| anyhow!("no GPU adapter available"))
            }
        }
    }

    async fn open(adapter: &wgpu::Adapter, settings: ContextSettings, format: wgpu::TextureFormat, width: u32, height: u32) -> anyhow::Result<Self> {
        let info = adapter.get_info();
        log::info!("Vendor: {:#06x}", info.vendor);
        log::info!("Renderer: {}", info.name);
        log::info!("Backend: {:?}, driver: {} {}", info.backend, info.driver, info.driver_info);

        let clamp_to_border = adapter.features().contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        if !clamp_to_border {
            log::warn!("Adapter cannot clamp to border, texture edges will clamp to edge instead");
        }
        let required_features = if clamp_to_border {
            wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER
        } else {
            wgpu::Features::empty()
        };

        let mut sample_count = settings.sample_count();
        let color_flags = adapter.get_texture_format_features(format).flags;
        let depth_flags = adapter.get_texture_format_features(settings.depth_format()).flags;
        if !(color_flags.sample_count_supported(sample_count) && depth_flags.sample_count_supported(sample_count)) {
            log::warn!("{}x antialiasing is not supported for {:?}, rendering without it", sample_count, format);
            sample_count = 1;
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Stereo Device"),
                    required_features,
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        // The default handler panics
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| log::error!("GPU error: {error}")));

        let targets = Self::create_targets(&device, format, &settings, sample_count, width.max(1), height.max(1));
        Ok(Self { device, queue, format, settings, sample_count, clamp_to_border, targets })
    }

    fn create_targets(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        settings: &ContextSettings,
        sample_count: u32,
        width: u32,
        height: u32,
    ) -> FrameTargets {
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"), size, mip_level_count: 1, sample_count,
            dimension: wgpu::TextureDimension::D2, format: settings.depth_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT, view_formats: &[],
        });
        let msaa = (sample_count > 1).then(|| device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA"), size, mip_level_count: 1, sample_count,
            dimension: wgpu::TextureDimension::D2, format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT, view_formats: &[],
        }));

        FrameTargets {
            width,
            height,
            msaa: msaa.map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default())),
            depth: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.targets = Self::create_targets(&self.device, self.format, &self.settings, self.sample_count, width, height);
        }
    }

    /// Runs `f` inside a validation error scope and returns whatever error it raised.
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }
}

/// Uniform buffer and bind group feeding one eye's draw.
struct EyeBinding {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct State {
    pub ctx: GpuContext,
    cube: Cube,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_shader: wgpu::ShaderModule,
    fragment_shader: wgpu::ShaderModule,
    pipeline: wgpu::RenderPipeline,
    image: DecodedImage,
    texture: Texture,
    eyes: [EyeBinding; 2],
    cameras: StereoCamera,
    camera_controller: CameraController,
}

impl State {
    /// Creates every GPU object the demo uses. Anything short of losing the device is logged and skipped over.
    pub fn new(ctx: GpuContext, texture_path: &Path) -> Self {
        let cube = Cube::new();

        // Sized for all three attribute arrays, filled every frame
        let vertex_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"), size: vertex::vertex_buffer_size(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST, mapped_at_creation: false,
        });
        let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"), contents: bytemuck::cast_slice(cube.indices()), usage: wgpu::BufferUsages::INDEX,
        });

        log::info!("Setting Up Vertex Shader");
        let (vertex_shader, vertex_reflection) = Self::compile_shader(&ctx, "Vertex Shader", shader::VERTEX_SHADER);
        log::info!("Setting Up Fragment Shader");
        let (fragment_shader, fragment_reflection) = Self::compile_shader(&ctx, "Fragment Shader", shader::FRAGMENT_SHADER);

        let bindings = ShaderBindings::resolve(vertex_reflection.as_ref(), fragment_reflection.as_ref());
        if !bindings.is_complete() {
            log::warn!("Falling back to declared slots for unresolved shader inputs");
        }
        if !EyeUniform::layout_matches(&bindings) {
            log::warn!("Eye uniform layout differs from the shader, transforms will be misread");
        }

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Eye Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: bindings.uniform.unwrap_or(0), visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None }, count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: bindings.texture.unwrap_or(1), visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2, multisampled: false,
                    }, count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: bindings.sampler.unwrap_or(2), visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering), count: None,
                },
            ],
        });

        log::info!("Setting Up and Linking Shader");
        let pipeline = Self::link_pipeline(&ctx, &bind_group_layout, &vertex_shader, &fragment_shader, &bindings);

        let image = DecodedImage::load_or_empty(texture_path);
        let texture = Texture::from_image(&ctx.device, &ctx.queue, &image, ctx.clamp_to_border);

        let cameras = StereoCamera::new();
        let eyes = Eye::BOTH.map(|eye| {
            let uniform_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match eye {
                    Eye::Left => "Left Eye Uniform",
                    Eye::Right => "Right Eye Uniform",
                }),
                contents: bytemuck::cast_slice(&[EyeUniform::new(cameras.eye(eye).mvp)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: bindings.uniform.unwrap_or(0), resource: uniform_buffer.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: bindings.texture.unwrap_or(1), resource: wgpu::BindingResource::TextureView(&texture.view) },
                    wgpu::BindGroupEntry { binding: bindings.sampler.unwrap_or(2), resource: wgpu::BindingResource::Sampler(&texture.sampler) },
                ],
            });
            EyeBinding { uniform_buffer, bind_group }
        });

        Self {
            ctx, cube, vertex_buffer, index_buffer,
            vertex_shader, fragment_shader, pipeline,
            image, texture, eyes,
            cameras, camera_controller: CameraController::new(),
        }
    }

    /// Compiles one WGSL stage. A failed compile is logged and still yields a (broken) module.
    fn compile_shader(ctx: &GpuContext, label: &str, source: &str) -> (wgpu::ShaderModule, Option<ShaderReflection>) {
        let reflection = match ShaderReflection::compile(source) {
            Ok(reflection) => Some(reflection),
            Err(e) => {
                log::error!("ERROR: {label} Compilation Error\n{e}");
                None
            }
        };

        let (module, error) = ctx.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label), source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        match error {
            None if reflection.is_some() => log::info!("{label} Compiled"),
            None => {}
            Some(e) => log::error!("ERROR: {label} Compilation Error\n{e}"),
        }
        (module, reflection)
    }

    fn link_pipeline(
        ctx: &GpuContext,
        bind_group_layout: &wgpu::BindGroupLayout,
        vertex_shader: &wgpu::ShaderModule,
        fragment_shader: &wgpu::ShaderModule,
        bindings: &ShaderBindings,
    ) -> wgpu::RenderPipeline {
        let layouts = VertexLayouts::new(bindings.attribute_locations());

        let (pipeline, error) = ctx.validated(|device| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None, bind_group_layouts: &[bind_group_layout], push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Cube Pipeline"), layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex_shader, entry_point: shader::VERTEX_ENTRY,
                    buffers: &layouts.buffers(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment_shader, entry_point: shader::FRAGMENT_ENTRY,
                    targets: &[Some(wgpu::ColorTargetState { format: ctx.format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: ctx.settings.depth_format(), depth_write_enabled: true, depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(), bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState { count: ctx.sample_count, mask: !0, alpha_to_coverage_enabled: false },
                multiview: None,
            })
        });

        match error {
            None => log::info!("Shader Linked"),
            Some(e) => log::error!("ERROR: Shader Link Error\n{e}"),
        }
        pipeline
    }

    pub fn resize(&mut self, surface: &mut WindowSurface, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            surface.configure(&self.ctx.device, new_size);
            self.ctx.resize(new_size.width, new_size.height);
        }
    }

    pub fn input(&mut self, event: &WindowEvent) -> bool {
        self.camera_controller.process_events(event)
    }

    pub fn update(&mut self) {
        log::trace!("Updating...");
        self.cameras.update(self.camera_controller.rotation());
    }

    /// Draws one frame into the window and presents it.
    pub fn render_to_surface(&mut self, surface: &WindowSurface) -> Result<(), wgpu::SurfaceError> {
        let output = surface.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.render(&view);
        output.present();
        Ok(())
    }

    /// Draws both eyes into `target`, which must match the context's format and size.
    /// Returns the validation error the frame raised, after logging it.
    pub fn render(&mut self, target: &wgpu::TextureView) -> Option<wgpu::Error> {
        log::trace!("Render Loop...");
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Vertices, colors and UVs, every frame
        for (offset, bytes) in vertex::vertex_uploads(&self.cube) {
            self.ctx.queue.write_buffer(&self.vertex_buffer, offset, bytes);
        }

        let passes = frame::plan(&self.cameras, self.ctx.targets.width, self.ctx.targets.height);
        for pass in &passes {
            let eye = &self.eyes[pass.eye.index()];
            self.ctx.queue.write_buffer(&eye.uniform_buffer, 0, bytemuck::cast_slice(&[pass.uniform]));
        }

        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Stereo Frame") });
        {
            let (color_view, resolve_target) = match &self.ctx.targets.msaa {
                Some(msaa) => (msaa, Some(target)),
                None => (target, None),
            };

            // Eye regions are disjoint, so one clear covers both before either is drawn
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Stereo Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view, resolve_target,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(config::CLEAR_COLOR), store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.targets.depth,
                    depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None, occlusion_query_set: None,
            });

            for pass in &passes {
                self.draw_eye(&mut render_pass, pass);
            }
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let error = pollster::block_on(self.ctx.device.pop_error_scope());
        if let Some(error) = &error {
            log::error!("GPU error during frame: {error}");
        }
        error
    }

    fn draw_eye<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, pass: &EyePass) {
        pass.viewport.apply(render_pass);

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.eyes[pass.eye.index()].bind_group, &[]);

        for (slot, attribute) in Attribute::ALL.into_iter().enumerate() {
            render_pass.set_vertex_buffer(slot as u32, self.vertex_buffer.slice(attribute.region()));
        }
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        render_pass.draw_indexed(0..cube::INDEX_COUNT, 0, 0..1);
    }

    /// Releases every GPU object and the decoded image. Takes `self`, so it runs at most once.
    pub fn unload(self) {
        log::info!("Cleaning up...");
        let Self { ctx, vertex_buffer, index_buffer, vertex_shader, fragment_shader, pipeline, image, texture, eyes, .. } = self;

        // The pipeline holds both shaders
        drop(pipeline);
        drop(vertex_shader);
        drop(fragment_shader);

        vertex_buffer.destroy();
        index_buffer.destroy();
        for eye in eyes {
            eye.uniform_buffer.destroy();
        }
        texture.destroy();
        image.release();

        let _ = ctx.device.poll(wgpu::Maintain::Wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: usize = 5;

    fn offscreen_target(ctx: &GpuContext) -> wgpu::TextureView {
        ctx.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Target"),
                size: wgpu::Extent3d { width: config::WINDOW_WIDTH, height: config::WINDOW_HEIGHT, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: ctx.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[test]
    fn frames_render_without_errors_when_the_texture_is_missing() {
        let ctx = pollster::block_on(GpuContext::headless(
            ContextSettings::default(),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            config::WINDOW_WIDTH,
            config::WINDOW_HEIGHT,
        ));
        let Ok(ctx) = ctx else {
            eprintln!("no GPU adapter, skipping");
            return;
        };

        let dir = tempfile::tempdir().unwrap();
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut state = State::new(ctx, &dir.path().join("missing.tga"));
        let init_error = pollster::block_on(state.ctx.device.pop_error_scope());
        assert!(init_error.is_none(), "initialization raised {init_error:?}");

        let target = offscreen_target(&state.ctx);
        for frame in 0..FRAMES {
            state.update();
            let error = state.render(&target);
            assert!(error.is_none(), "frame {frame} raised {error:?}");
        }
        let _ = state.ctx.device.poll(wgpu::Maintain::Wait);

        assert_eq!(state.cube, Cube::new());
        state.unload();
    }
}
