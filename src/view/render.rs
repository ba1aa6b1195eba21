use std::num::NonZeroU64;

use bytemuck::NoUninit;
use tracing::{debug, info, warn};
use wgpu::util::{DeviceExt, TextureDataOrder};
use wgpu::*;

use crate::assets::{AssetStore, ImageData, MeshId, TextureId};
use crate::utils::{MeshBuffer, Vertex};
use crate::view::frame::{DrawCommand, Frame, Material};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl LightingUniform {
    /// Flat, full-brightness shading.
    pub const UNLIT: Self = Self::new(0.0, 1.0);
    /// Grey ambient plus a grey light shining into the screen.
    pub const LIT: Self = Self::new(0.5, 0.5);

    const fn new(sun_intensity: f32, ambient: f32) -> Self {
        Self {
            sun_dir: [0.0, 0.0, 1.0],
            sun_intensity,
            ambient,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        }
    }
}

const MODE_TEXTURE: u32 = 0;
const MODE_NORMAL: u32 = 1;
const MODE_FILL: u32 = 2;

/// Per-draw data, bound with a dynamic offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub mode: u32,
    pub _pad: [u32; 3],
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

impl DrawUniform {
    fn from_command(cmd: &DrawCommand, srgb_target: bool) -> Self {
        let (mode, color) = match cmd.material {
            Material::Texture(_) => (MODE_TEXTURE, [1.0; 4]),
            Material::Normal => (MODE_NORMAL, [1.0; 4]),
            Material::Fill(c) => (MODE_FILL, if srgb_target { srgb_to_linear(c) } else { c }),
        };
        Self {
            model: cmd.transform.to_cols_array_2d(),
            color,
            mode,
            _pad: [0; 3],
        }
    }
}

fn srgb_to_linear(c: [f32; 4]) -> [f32; 4] {
    let f = |v: f32| {
        if v <= 0.04045 { v / 12.92 } else { ((v + 0.055) / 1.055).powf(2.4) }
    };
    [f(c[0]), f(c[1]), f(c[2]), c[3]]
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub camera_bind_group: BindGroup,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX, false, None),
            uniform_entry(1, ShaderStages::FRAGMENT, false, None),
        ],
    });

    let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

fn uniform_entry(
    binding: u32,
    visibility: ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
}

pub struct PipelineResources {
    pub pipeline: RenderPipeline,
    pub draw_layout: BindGroupLayout,
    pub texture_layout: BindGroupLayout,
}

pub fn create_model_pipeline(
    device: &Device,
    format: TextureFormat,
    camera_layout: &BindGroupLayout,
) -> PipelineResources {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("model_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
    });

    let draw_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("draw_bind_group_layout"),
        entries: &[uniform_entry(
            0,
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            true,
            NonZeroU64::new(DRAW_UNIFORM_SIZE),
        )],
    });

    let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("model_pipeline_layout"),
        bind_group_layouts: &[camera_layout, &draw_layout, &texture_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("model_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
                step_mode: VertexStepMode::Vertex,
                attributes: &[
                    VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 12, shader_location: 1, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 24, shader_location: 2, format: VertexFormat::Float32x2 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // the Y flip in the projection reverses winding; OBJ files are not consistent anyway
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    PipelineResources { pipeline, draw_layout, texture_layout }
}

fn upload_texture(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &Sampler,
    image: &ImageData,
    label: &str,
) -> BindGroup {
    let texture = device.create_texture_with_data(
        queue,
        &TextureDescriptor {
            label: Some(label),
            size: Extent3d { width: image.width, height: image.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &image.rgba,
    );
    let view = texture.create_view(&TextureViewDescriptor::default());
    device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: BindingResource::TextureView(&view) },
            BindGroupEntry { binding: 1, resource: BindingResource::Sampler(sampler) },
        ],
    })
}

/// Growable uniform buffer holding one [`DrawUniform`] per draw.
struct DrawBuffer {
    buffer: Buffer,
    bind_group: BindGroup,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl DrawBuffer {
    fn new(device: &Device, layout: &BindGroupLayout, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(DRAW_UNIFORM_SIZE, alignment);
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some("draw_uniforms"),
            size: stride * capacity as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });
        Self { buffer, bind_group, stride, capacity, staging: Vec::new() }
    }

    /// Upload `uniforms`, growing first if needed. Returns each draw's offset.
    fn write(
        &mut self,
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
        uniforms: &[DrawUniform],
    ) -> Vec<u32> {
        if uniforms.len() > self.capacity {
            let capacity = uniforms.len().next_power_of_two();
            debug!(from = self.capacity, to = capacity, "growing draw uniform buffer");
            *self = Self::new(device, layout, capacity);
        }
        if uniforms.is_empty() {
            return Vec::new();
        }

        let stride = self.stride as usize;
        self.staging.clear();
        self.staging.resize(stride * uniforms.len(), 0);
        for (i, u) in uniforms.iter().enumerate() {
            let start = i * stride;
            self.staging[start..start + DRAW_UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(u));
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);

        (0..uniforms.len()).map(|i| (i * stride) as u32).collect()
    }
}

/// GPU-side copies of everything in the asset store plus the per-frame
/// buffers needed to draw a [`Frame`].
pub struct RenderState {
    // wgpu resources
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,

    pipeline: PipelineResources,
    camera: CameraResources,
    depth_view: TextureView,
    meshes: Vec<Option<MeshBuffer>>,
    textures: Vec<BindGroup>,
    white_texture: BindGroup,
    draws: DrawBuffer,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn new(
        device: &Device,
        queue: &Queue,
        config: &SurfaceConfiguration,
        store: &AssetStore,
    ) -> Self {
        let camera = create_camera_resources(device);
        let pipeline = create_model_pipeline(device, config.format, &camera.bind_group_layout);
        let (_, depth_view) = create_depth_texture(device, config.width, config.height);

        let meshes = store
            .meshes()
            .iter()
            .map(|mesh| (!mesh.is_empty()).then(|| mesh.upload(device)))
            .collect();

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("model_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let textures = store
            .images()
            .iter()
            .enumerate()
            .map(|(i, image)| {
                upload_texture(device, queue, &pipeline.texture_layout, &sampler, image, &format!("texture_{i}"))
            })
            .collect();
        let white = ImageData { width: 1, height: 1, rgba: vec![255; 4] };
        let white_texture =
            upload_texture(device, queue, &pipeline.texture_layout, &sampler, &white, "white_texture");

        let draws = DrawBuffer::new(device, &pipeline.draw_layout, 256);
        let egui_renderer = egui_wgpu::Renderer::new(device, config.format, egui_wgpu::RendererOptions::default());

        info!(
            meshes = store.meshes().len(),
            textures = store.images().len(),
            "gpu resources uploaded"
        );

        Self {
            format: config.format,
            alpha_mode: config.alpha_mode,
            width: config.width,
            height: config.height,
            pipeline,
            camera,
            depth_view,
            meshes,
            textures,
            white_texture,
            draws,
            egui_renderer,
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        }
    }

    fn surface_config(&self) -> SurfaceConfiguration {
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width,
            height: self.height,
            present_mode: PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Reconfigure the surface and depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        surface.configure(device, &self.surface_config());
        self.depth_view = create_depth_texture(device, width, height).1;
    }

    fn mesh(&self, id: MeshId) -> Option<&MeshBuffer> {
        self.meshes.get(id.0).and_then(Option::as_ref)
    }

    fn texture(&self, id: TextureId) -> &BindGroup {
        self.textures.get(id.0).unwrap_or(&self.white_texture)
    }

    /// Draw `frame` and any pending egui output. A lost or outdated surface
    /// is reconfigured and the frame skipped; only unrecoverable surface
    /// errors are returned.
    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        frame: &Frame,
    ) -> Result<(), SurfaceError> {
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                debug!("surface lost, reconfiguring");
                surface.configure(device, &self.surface_config());
                return Ok(());
            }
            Err(SurfaceError::Timeout) => {
                warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let srgb = self.format.is_srgb();
        let camera = CameraUniform { view_proj: frame.view_proj.to_cols_array_2d() };
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&camera));
        let lighting = if frame.lights { LightingUniform::LIT } else { LightingUniform::UNLIT };
        queue.write_buffer(&self.camera.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        let uniforms: Vec<DrawUniform> =
            frame.draws.iter().map(|cmd| DrawUniform::from_command(cmd, srgb)).collect();
        let offsets = self.draws.write(device, queue, &self.pipeline.draw_layout, &uniforms);

        let clear = if srgb { srgb_to_linear(frame.clear_color) } else { frame.clear_color };
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline.pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            for (cmd, offset) in frame.draws.iter().zip(offsets) {
                let Some(mesh) = self.mesh(cmd.mesh) else { continue };
                let texture = match cmd.material {
                    Material::Texture(id) => self.texture(id),
                    _ => &self.white_texture,
                };
                rp.set_bind_group(1, &self.draws.bind_group, &[offset]);
                rp.set_bind_group(2, texture, &[]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        if let (Some(primitives), Some(full_output)) =
            (self.egui_primitives.take(), self.egui_full_output.take())
        {
            self.render_egui(device, queue, &mut encoder, &view, &primitives, &full_output);
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn render_egui(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        primitives: &[egui::ClippedPrimitive],
        full_output: &egui::FullOutput,
    ) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: self.egui_dpr,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
