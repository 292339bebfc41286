//! [`GraphicsDevice`] over wgpu.
//!
//! Presents a WebGPU context, so negotiation always lands on the WGSL tier:
//! vertices come from the vertex index, uniform slots and the sampler binding
//! are fixed by the module. Uniforms live in one small buffer that is
//! uploaded right before each draw.

use std::collections::{BTreeMap, HashMap};

use crate::{
    device::{
        Api, BufferId, ContextInfo, DrawCall, FramebufferId, FramebufferStatus, GraphicsDevice,
        ProgramId, ShaderId, ShaderStage, TextureDesc, TextureFormat, TextureId, UniformValue,
        Version, VertexInput,
    },
    foundation::{
        core::TexelRect,
        error::{DistanceFieldError, DistanceFieldResult},
    },
    shader::sources,
};

const VERTEX_ENTRY: &str = "vs_main";
const FRAGMENT_ENTRY: &str = "fs_main";
/// `scaling`, `offset`, `image_size_inverted` and padding, two floats each.
const PARAM_SLOTS: usize = 4;
const PARAMS_SIZE: u64 = (PARAM_SLOTS * 2 * std::mem::size_of::<f32>()) as u64;

struct GpuTexture {
    desc: TextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
}

struct GpuProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    linked: bool,
    params: [[f32; 2]; PARAM_SLOTS],
    params_buffer: wgpu::Buffer,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

struct GpuFramebuffer {
    viewport: TexelRect,
    color: Option<TextureId>,
}

pub struct WgpuDevice {
    info: ContextInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    next_id: u32,
    textures: BTreeMap<u32, GpuTexture>,
    shaders: BTreeMap<u32, GpuShader>,
    programs: BTreeMap<u32, GpuProgram>,
    buffers: BTreeMap<u32, wgpu::Buffer>,
    framebuffers: BTreeMap<u32, GpuFramebuffer>,
    units: BTreeMap<u32, TextureId>,
}

impl WgpuDevice {
    /// Open the first high-performance adapter.
    ///
    /// A machine without a usable adapter is a `Configuration` error.
    pub fn new() -> DistanceFieldResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                tracing::warn!("no gpu adapter available");
                DistanceFieldError::configuration("no gpu adapter available")
            }
            other => {
                DistanceFieldError::configuration(format!("wgpu request_adapter failed: {other:?}"))
            }
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("distfield"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            DistanceFieldError::configuration(format!("wgpu request_device failed: {e:?}"))
        })?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("distfield_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(PARAMS_SIZE),
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("distfield_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let info = adapter.get_info();
        tracing::debug!(adapter = %info.name, backend = ?info.backend, "opened gpu device");

        let max_units = device.limits().max_sampled_textures_per_shader_stage;
        Ok(Self {
            info: ContextInfo::new(Api::WebGpu, Version::new(1, 0))
                .with_max_texture_units(max_units),
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            next_id: 1,
            textures: BTreeMap::new(),
            shaders: BTreeMap::new(),
            programs: BTreeMap::new(),
            buffers: BTreeMap::new(),
            framebuffers: BTreeMap::new(),
            units: BTreeMap::new(),
        })
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run `f` inside an error scope and report what the scope caught.
    fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(filter);
        let out = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (out, error)
    }

    fn texture(&self, texture: TextureId) -> DistanceFieldResult<&GpuTexture> {
        self.textures
            .get(&texture.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown texture {texture:?}")))
    }

    fn program(&self, program: ProgramId) -> DistanceFieldResult<&GpuProgram> {
        self.programs
            .get(&program.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown program {program:?}")))
    }

    fn pipeline(
        &self,
        program: &GpuProgram,
        format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, Option<wgpu::Error>) {
        self.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("distfield_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

fn aspect(format: TextureFormat) -> wgpu::TextureAspect {
    match format {
        TextureFormat::Depth32Float => wgpu::TextureAspect::DepthOnly,
        _ => wgpu::TextureAspect::All,
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

impl GraphicsDevice for WgpuDevice {
    fn context_info(&self) -> &ContextInfo {
        &self.info
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> DistanceFieldResult<TextureId> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(DistanceFieldError::resource(format!(
                "texture size {}x{} is outside 1..={max}",
                desc.width, desc.height
            )));
        }

        let mut usage = wgpu::TextureUsages::COPY_SRC;
        if desc.format != TextureFormat::Depth32Float {
            usage |= wgpu::TextureUsages::COPY_DST;
        }
        if desc.usage.sampled {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if desc.usage.render_attachment {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let (texture, error) = self.scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("distfield_texture"),
                size: extent(desc.width, desc.height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu_format(desc.format),
                usage,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(DistanceFieldError::resource(format!(
                "texture allocation failed: {error}"
            )));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            aspect: aspect(desc.format),
            ..Default::default()
        });
        let id = self.alloc_id();
        self.textures.insert(
            id,
            GpuTexture {
                desc: *desc,
                texture,
                view,
            },
        );
        Ok(TextureId(id))
    }

    fn texture_desc(&self, texture: TextureId) -> DistanceFieldResult<TextureDesc> {
        Ok(self.texture(texture)?.desc)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> DistanceFieldResult<()> {
        let tex = self.texture(texture)?;
        let desc = tex.desc;
        if desc.format == TextureFormat::Depth32Float {
            return Err(DistanceFieldError::device("depth textures cannot be uploaded"));
        }
        if desc.byte_len() != Some(data.len()) {
            return Err(DistanceFieldError::device(format!(
                "texture {texture:?} expects {:?} bytes, got {}",
                desc.byte_len(),
                data.len()
            )));
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * desc.format.bytes_per_texel() as u32),
                rows_per_image: Some(desc.height),
            },
            extent(desc.width, desc.height),
        );
        Ok(())
    }

    fn read_texture(&mut self, texture: TextureId) -> DistanceFieldResult<Vec<u8>> {
        let tex = self.texture(texture)?;
        let desc = tex.desc;
        let row_bytes = desc
            .width
            .checked_mul(desc.format.bytes_per_texel() as u32)
            .ok_or_else(|| DistanceFieldError::device("readback row overflow"))?;
        let padded_row_bytes = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("distfield_readback"),
            size: u64::from(padded_row_bytes) * u64::from(desc.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("distfield_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: aspect(desc.format),
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(desc.height),
                },
            },
            extent(desc.width, desc.height),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| DistanceFieldError::device(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| DistanceFieldError::device("readback channel closed"))?
            .map_err(|e| DistanceFieldError::device(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity(row_bytes as usize * desc.height as usize);
        for row in mapped.chunks_exact(padded_row_bytes as usize) {
            out.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(mapped);
        readback.unmap();
        Ok(out)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(tex) = self.textures.remove(&texture.0) {
            tex.texture.destroy();
        }
        self.units.retain(|_, bound| *bound != texture);
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        sources: &[String],
    ) -> DistanceFieldResult<ShaderId> {
        let text = sources.concat();
        let (module, error) = self.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("distfield_shader"),
                source: wgpu::ShaderSource::Wgsl(text.into()),
            })
        });
        if let Some(error) = error {
            return Err(DistanceFieldError::build(format!(
                "{stage:?} shader failed to compile:\n{error}"
            )));
        }
        let id = self.alloc_id();
        self.shaders.insert(id, GpuShader { stage, module });
        Ok(ShaderId(id))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader.0);
    }

    fn create_program(&mut self, shaders: &[ShaderId]) -> DistanceFieldResult<ProgramId> {
        let mut vertex = None;
        let mut fragment = None;
        for id in shaders {
            let shader = self
                .shaders
                .get(&id.0)
                .ok_or_else(|| DistanceFieldError::device(format!("unknown shader {id:?}")))?;
            let slot = match shader.stage {
                ShaderStage::Vertex => &mut vertex,
                ShaderStage::Fragment => &mut fragment,
            };
            if slot.replace(shader.module.clone()).is_some() {
                return Err(DistanceFieldError::build(format!(
                    "program has more than one {:?} shader",
                    shader.stage
                )));
            }
        }
        let (Some(vertex), Some(fragment)) = (vertex, fragment) else {
            return Err(DistanceFieldError::build(
                "program needs one vertex and one fragment shader",
            ));
        };

        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("distfield_params"),
            size: PARAMS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = self.alloc_id();
        self.programs.insert(
            id,
            GpuProgram {
                vertex,
                fragment,
                linked: false,
                params: [[0.0; 2]; PARAM_SLOTS],
                params_buffer,
                pipelines: HashMap::new(),
            },
        );
        Ok(ProgramId(id))
    }

    fn bind_attribute_location(
        &mut self,
        program: ProgramId,
        _location: u32,
        _name: &str,
    ) -> DistanceFieldResult<()> {
        // Vertex positions never come from attributes here.
        self.program(program).map(|_| ())
    }

    fn link_program(&mut self, program: ProgramId) -> DistanceFieldResult<()> {
        // Linking checks the stage interfaces by building the pipeline for
        // the common output format; other formats are built on first draw.
        let format = wgpu::TextureFormat::R8Unorm;
        let (pipeline, error) = self.pipeline(self.program(program)?, format);
        if let Some(error) = error {
            return Err(DistanceFieldError::build(format!(
                "program {program:?} failed to link:\n{error}"
            )));
        }
        if let Some(prog) = self.programs.get_mut(&program.0) {
            prog.pipelines.insert(format, pipeline);
            prog.linked = true;
        }
        Ok(())
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32> {
        self.programs.get(&program.0).filter(|p| p.linked)?;
        match name {
            sources::SCALING_UNIFORM => Some(sources::SCALING_LOCATION),
            sources::OFFSET_UNIFORM => Some(sources::OFFSET_LOCATION),
            sources::IMAGE_SIZE_INVERTED_UNIFORM => Some(sources::IMAGE_SIZE_INVERTED_LOCATION),
            _ => None,
        }
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: i32,
        value: UniformValue,
    ) -> DistanceFieldResult<()> {
        let prog = self
            .programs
            .get_mut(&program.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown program {program:?}")))?;
        if location == -1 {
            return Ok(());
        }
        let slot = usize::try_from(location)
            .ok()
            .filter(|slot| *slot < PARAM_SLOTS - 1)
            .ok_or_else(|| {
                DistanceFieldError::device(format!("no uniform at location {location}"))
            })?;
        match value {
            UniformValue::Vec2(v) => {
                prog.params[slot] = v;
                Ok(())
            }
            UniformValue::Int(_) => Err(DistanceFieldError::device(format!(
                "uniform at location {location} is a vec2"
            ))),
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(prog) = self.programs.remove(&program.0) {
            prog.params_buffer.destroy();
        }
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> DistanceFieldResult<BufferId> {
        let bytes: Vec<u8> = vertices
            .iter()
            .flat_map(|v| v.iter().flat_map(|c| c.to_le_bytes()))
            .collect();
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("distfield_vertices"),
            size: bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, &bytes);
        let id = self.alloc_id();
        self.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            buffer.destroy();
        }
    }

    fn create_framebuffer(&mut self, viewport: TexelRect) -> DistanceFieldResult<FramebufferId> {
        let id = self.alloc_id();
        self.framebuffers.insert(
            id,
            GpuFramebuffer {
                viewport,
                color: None,
            },
        );
        Ok(FramebufferId(id))
    }

    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
    ) -> DistanceFieldResult<()> {
        self.texture(texture)?;
        let fb = self.framebuffers.get_mut(&framebuffer.0).ok_or_else(|| {
            DistanceFieldError::device(format!("unknown framebuffer {framebuffer:?}"))
        })?;
        fb.color = Some(texture);
        Ok(())
    }

    fn clear_color(&mut self, framebuffer: FramebufferId) -> DistanceFieldResult<()> {
        if !self.check_status(framebuffer).is_complete() {
            return Ok(());
        }
        let fb = self.framebuffers.get(&framebuffer.0).ok_or_else(|| {
            DistanceFieldError::device(format!("unknown framebuffer {framebuffer:?}"))
        })?;
        let color = fb
            .color
            .ok_or_else(|| DistanceFieldError::device("framebuffer has no colour attachment"))?;
        let viewport = fb.viewport;
        let tex = self.texture(color)?;
        let bpp = tex.desc.format.bytes_per_texel();
        let zeros = vec![0u8; viewport.width as usize * viewport.height as usize * bpp];
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: viewport.x,
                    y: viewport.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &zeros,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(viewport.width * bpp as u32),
                rows_per_image: Some(viewport.height),
            },
            extent(viewport.width, viewport.height),
        );
        Ok(())
    }

    fn check_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer.0) else {
            return FramebufferStatus::Unsupported;
        };
        let Some(color) = fb.color else {
            return FramebufferStatus::MissingAttachment;
        };
        let Some(tex) = self.textures.get(&color.0) else {
            return FramebufferStatus::IncompleteAttachment;
        };
        if !tex.desc.format.is_color_renderable() || !tex.desc.usage.render_attachment {
            return FramebufferStatus::IncompleteAttachment;
        }
        if !fb.viewport.fits_within(tex.desc.width, tex.desc.height) {
            return FramebufferStatus::IncompleteDimensions;
        }
        FramebufferStatus::Complete
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer.0);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> DistanceFieldResult<()> {
        if unit >= self.info.max_texture_units {
            return Err(DistanceFieldError::device(format!(
                "texture unit {unit} exceeds the {} available",
                self.info.max_texture_units
            )));
        }
        self.texture(texture)?;
        self.units.insert(unit, texture);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn draw(&mut self, call: &DrawCall) -> DistanceFieldResult<()> {
        if let VertexInput::Buffer { location, .. } = call.vertices {
            return Err(DistanceFieldError::device(format!(
                "vertex attribute {location} is not supported, positions come from the vertex index"
            )));
        }
        let status = self.check_status(call.framebuffer);
        if !status.is_complete() {
            return Err(DistanceFieldError::RenderTargetUnusable { status });
        }
        let fb = &self.framebuffers[&call.framebuffer.0];
        let viewport = fb.viewport;
        let target_id = fb
            .color
            .ok_or_else(|| DistanceFieldError::device("framebuffer has no colour attachment"))?;
        let source_id = *self
            .units
            .get(&sources::TEXTURE_UNIT)
            .ok_or_else(|| DistanceFieldError::device("no texture bound to the sampler unit"))?;
        if source_id == target_id {
            return Err(DistanceFieldError::device(
                "texture is both sampled and rendered in one draw",
            ));
        }

        let source = self.texture(source_id)?;
        if !source.desc.usage.sampled {
            return Err(DistanceFieldError::device(format!(
                "texture {source_id:?} is not sampleable"
            )));
        }
        let target = self.texture(target_id)?;
        let format = wgpu_format(target.desc.format);

        let prog = self.program(call.program)?;
        if !prog.linked {
            return Err(DistanceFieldError::device(format!(
                "program {:?} is not linked",
                call.program
            )));
        }
        let pipeline = match prog.pipelines.get(&format) {
            Some(pipeline) => pipeline.clone(),
            None => {
                let (pipeline, error) = self.pipeline(prog, format);
                if let Some(error) = error {
                    return Err(DistanceFieldError::device(format!(
                        "pipeline for {format:?} failed: {error}"
                    )));
                }
                pipeline
            }
        };

        let mut params = Vec::with_capacity(PARAMS_SIZE as usize);
        for value in prog.params.iter().flatten() {
            params.extend_from_slice(&value.to_le_bytes());
        }
        self.queue.write_buffer(&prog.params_buffer, 0, &params);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("distfield_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: prog.params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("distfield_draw_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("distfield_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            rp.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);
            rp.draw(0..call.vertex_count, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        if let Some(prog) = self.programs.get_mut(&call.program.0) {
            prog.pipelines.entry(format).or_insert(pipeline);
        }
        Ok(())
    }
}
