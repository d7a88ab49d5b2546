use crate::shaders::{self, WORKGROUP_SIZE};
use bytemuck::{Pod, Zeroable};
use pathtrace_common::{RenderParams, Resolution};
use pathtrace_render::{BackendError, ComputeBackend};
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Camera and control block, mirrored by `Params` in the trace kernel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuParams {
    position: [f32; 3],
    fov_y: f32,
    forward: [f32; 3],
    exposure: f32,
    right: [f32; 3],
    samples_per_frame: u32,
    up: [f32; 3],
    max_bounces: u32,
    width: u32,
    height: u32,
    _pad: [u32; 2],
}

impl From<&RenderParams> for GpuParams {
    fn from(p: &RenderParams) -> Self {
        Self {
            position: p.position.to_array(),
            fov_y: p.fov_y,
            forward: p.forward.to_array(),
            exposure: p.exposure,
            right: p.right.to_array(),
            samples_per_frame: p.samples_per_frame,
            up: p.up.to_array(),
            max_bounces: p.max_bounces,
            width: p.resolution.width,
            height: p.resolution.height,
            _pad: [0; 2],
        }
    }
}

/// Per-dispatch block. `sample_base == 0` makes the kernel overwrite.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniform {
    sample_base: u32,
    seed: u32,
    width: u32,
    height: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DisplayUniform {
    samples: u32,
    exposure: f32,
    width: u32,
    height: u32,
}

/// Bytes needed for one accumulation texel (rgb sum plus padding).
const TEXEL_BYTES: u64 = 16;

pub(crate) fn accumulation_size(resolution: Resolution) -> u64 {
    resolution.pixel_count().max(1) * TEXEL_BYTES
}

pub(crate) fn workgroup_count(resolution: Resolution) -> (u32, u32) {
    (
        resolution.width.div_ceil(WORKGROUP_SIZE),
        resolution.height.div_ceil(WORKGROUP_SIZE),
    )
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// The accumulated image as handed to the window: a ready-to-draw blit.
#[derive(Clone)]
pub struct PresentableImage {
    pipeline: Arc<wgpu::RenderPipeline>,
    bind_group: Arc<wgpu::BindGroup>,
    pub resolution: Resolution,
    pub samples: u64,
}

impl PresentableImage {
    /// Record the tone-mapped blit of the accumulation into `target`.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.bind_group.as_ref(), &[]);
        pass.draw(0..3, 0..1);
    }
}

impl std::fmt::Debug for PresentableImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentableImage")
            .field("resolution", &self.resolution)
            .field("samples", &self.samples)
            .finish_non_exhaustive()
    }
}

/// Progressive path tracer on a wgpu device.
///
/// Samples are summed into a storage buffer by a compute pass; the blit
/// divides by the sample count when presenting.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    trace_pipeline: wgpu::ComputePipeline,
    trace_layout: wgpu::BindGroupLayout,
    blit_pipeline: Arc<wgpu::RenderPipeline>,
    blit_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    frame_buffer: wgpu::Buffer,
    display_buffer: wgpu::Buffer,
    accumulation: wgpu::Buffer,
    trace_bind_group: wgpu::BindGroup,
    blit_bind_group: Arc<wgpu::BindGroup>,
    resolution: Resolution,
    params: Option<RenderParams>,
    samples: u64,
    seed: u32,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
        resolution: Resolution,
    ) -> Result<Self, BackendError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params_buffer"),
            contents: bytemuck::bytes_of(&GpuParams::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_buffer"),
            contents: bytemuck::bytes_of(&FrameUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let display_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("display_buffer"),
            contents: bytemuck::bytes_of(&DisplayUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let trace_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                uniform_entry(1, wgpu::ShaderStages::COMPUTE),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
            ],
        });
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
            ],
        });

        let trace_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trace_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::TRACE_SHADER.into()),
        });
        let trace_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trace_pipeline_layout"),
                bind_group_layouts: &[&trace_layout],
                push_constant_ranges: &[],
            });
        let trace_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trace_pipeline"),
            layout: Some(&trace_pipeline_layout),
            module: &trace_shader,
            entry_point: Some("trace_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
        });
        let blit_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("blit_pipeline_layout"),
                bind_group_layouts: &[&blit_layout],
                push_constant_ranges: &[],
            });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let accumulation = Self::create_accumulation(&device, resolution);
        let trace_bind_group = Self::create_trace_bind_group(
            &device,
            &trace_layout,
            &params_buffer,
            &frame_buffer,
            &accumulation,
        );
        let blit_bind_group = Self::create_blit_bind_group(
            &device,
            &blit_layout,
            &display_buffer,
            &accumulation,
        );

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BackendError::Device(err.to_string()));
        }
        tracing::info!(%resolution, ?surface_format, "wgpu backend ready");

        Ok(Self {
            device,
            queue,
            trace_pipeline,
            trace_layout,
            blit_pipeline: Arc::new(blit_pipeline),
            blit_layout,
            params_buffer,
            frame_buffer,
            display_buffer,
            accumulation,
            trace_bind_group,
            blit_bind_group: Arc::new(blit_bind_group),
            resolution,
            params: None,
            samples: 0,
            seed: 0,
        })
    }

    fn create_accumulation(device: &wgpu::Device, resolution: Resolution) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("accumulation_buffer"),
            size: accumulation_size(resolution),
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        })
    }

    fn create_trace_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        params: &wgpu::Buffer,
        frame: &wgpu::Buffer,
        accumulation: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: frame.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: accumulation.as_entire_binding(),
                },
            ],
        })
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        display: &wgpu::Buffer,
        accumulation: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: display.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: accumulation.as_entire_binding(),
                },
            ],
        })
    }

    fn check_allocation(&self, resolution: Resolution) -> Result<(), BackendError> {
        let limits = self.device.limits();
        let size = accumulation_size(resolution);
        let max = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        if size > max {
            return Err(BackendError::OutOfMemory(format!(
                "{resolution} needs {size} bytes, device allows {max}"
            )));
        }
        Ok(())
    }
}

impl ComputeBackend for WgpuBackend {
    type Image = PresentableImage;

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn upload_params(&mut self, params: &RenderParams) -> Result<(), BackendError> {
        if params.resolution != self.resolution {
            return Err(BackendError::Device(format!(
                "params for {} but buffers are {}",
                params.resolution, self.resolution
            )));
        }
        self.queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&GpuParams::from(params)),
        );
        self.params = Some(*params);
        Ok(())
    }

    fn reset_accumulation(&mut self) {
        self.samples = 0;
    }

    fn resize_buffers(&mut self, resolution: Resolution) -> Result<(), BackendError> {
        self.check_allocation(resolution)?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let accumulation = Self::create_accumulation(&self.device, resolution);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = oom {
            return Err(BackendError::OutOfMemory(err.to_string()));
        }
        if let Some(err) = validation {
            return Err(BackendError::Device(err.to_string()));
        }

        self.trace_bind_group = Self::create_trace_bind_group(
            &self.device,
            &self.trace_layout,
            &self.params_buffer,
            &self.frame_buffer,
            &accumulation,
        );
        self.blit_bind_group = Arc::new(Self::create_blit_bind_group(
            &self.device,
            &self.blit_layout,
            &self.display_buffer,
            &accumulation,
        ));
        self.accumulation = accumulation;
        self.resolution = resolution;
        self.samples = 0;
        tracing::debug!(%resolution, bytes = accumulation_size(resolution), "accumulation reallocated");
        Ok(())
    }

    fn dispatch_step(&mut self) -> Result<(), BackendError> {
        let params = self.params.ok_or(BackendError::NotReady)?;
        let frame = FrameUniform {
            sample_base: u32::try_from(self.samples).unwrap_or(u32::MAX),
            seed: self.seed,
            width: self.resolution.width,
            height: self.resolution.height,
        };
        let (groups_x, groups_y) = workgroup_count(self.resolution);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trace_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trace_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.trace_pipeline);
            pass.set_bind_group(0, &self.trace_bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Device(err.to_string()));
        }

        self.samples += u64::from(params.samples_per_frame);
        self.seed = self.seed.wrapping_add(1);
        tracing::trace!(samples = self.samples, groups_x, groups_y, "trace dispatched");
        Ok(())
    }

    fn current_image(&self) -> PresentableImage {
        let display = DisplayUniform {
            samples: u32::try_from(self.samples).unwrap_or(u32::MAX),
            exposure: self.params.map_or(1.0, |p| p.exposure),
            width: self.resolution.width,
            height: self.resolution.height,
        };
        self.queue
            .write_buffer(&self.display_buffer, 0, bytemuck::bytes_of(&display));
        PresentableImage {
            pipeline: Arc::clone(&self.blit_pipeline),
            bind_group: Arc::clone(&self.blit_bind_group),
            resolution: self.resolution,
            samples: self.samples,
        }
    }

    fn sample_count(&self) -> u64 {
        self.samples
    }

    fn wait_idle(&mut self) {
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<GpuParams>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 16);
        assert_eq!(std::mem::size_of::<DisplayUniform>(), 16);
    }

    #[test]
    fn gpu_params_copy_render_params() {
        let params = RenderParams {
            position: Vec3::new(1.0, 2.0, 3.0),
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            fov_y: 0.9,
            resolution: Resolution::new(640, 480),
            exposure: 1.5,
            samples_per_frame: 2,
            max_bounces: 6,
        };
        let gpu = GpuParams::from(&params);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.forward, [0.0, 0.0, -1.0]);
        assert_eq!(gpu.fov_y, 0.9);
        assert_eq!(gpu.exposure, 1.5);
        assert_eq!(gpu.samples_per_frame, 2);
        assert_eq!(gpu.max_bounces, 6);
        assert_eq!((gpu.width, gpu.height), (640, 480));
    }

    #[test]
    fn workgroups_cover_every_pixel() {
        assert_eq!(workgroup_count(Resolution::new(8, 8)), (1, 1));
        assert_eq!(workgroup_count(Resolution::new(9, 17)), (2, 3));
        assert_eq!(workgroup_count(Resolution::new(1280, 720)), (160, 90));
    }

    #[test]
    fn accumulation_holds_one_texel_per_pixel() {
        assert_eq!(accumulation_size(Resolution::new(4, 2)), 8 * TEXEL_BYTES);
        // never a zero-sized binding
        assert_eq!(accumulation_size(Resolution::new(0, 0)), TEXEL_BYTES);
    }
}
