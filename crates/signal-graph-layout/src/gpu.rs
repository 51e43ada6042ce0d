//! GPU resource management and the wgpu force backend.

use std::borrow::Cow;

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::backend::{ForceBackend, ForceField};
use crate::shaders::FORCE_SHADER;
use crate::{Anchor, LayoutError, Link, NodeSpan, Particle, Result, SimParams};

const WORKGROUP_SIZE: u32 = 256;

/// GPU context holding device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a new GPU context.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| LayoutError::GpuInit("No suitable GPU adapter found".into()))?;

        let adapter_info = adapter.get_info();
        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "gpu_adapter_selected"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Layout GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| LayoutError::GpuInit(e.to_string()))?;

        Ok(Self { device, queue })
    }
}

/// Bytes of `data`, or one zeroed element when empty (bindings may not be zero-sized).
fn padded_bytes<T: bytemuck::Pod>(data: &[T]) -> Cow<'_, [u8]> {
    if data.is_empty() {
        Cow::Owned(vec![0u8; std::mem::size_of::<T>()])
    } else {
        Cow::Borrowed(bytemuck::cast_slice(data))
    }
}

/// Element counts a set of buffers was sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BufferShape {
    particles: usize,
    links: usize,
    link_index: usize,
    anchors: usize,
    category_index: usize,
}

impl BufferShape {
    fn of(particles: &[Particle], field: &ForceField) -> Self {
        Self {
            particles: particles.len(),
            links: field.links.len(),
            link_index: field.link_index.len(),
            anchors: field.anchors.len(),
            category_index: field.category_index.len(),
        }
    }
}

/// GPU buffers for one graph shape.
struct ForceBuffers {
    shape: BufferShape,
    particles: wgpu::Buffer,
    links: wgpu::Buffer,
    link_index: wgpu::Buffer,
    spans: wgpu::Buffer,
    anchors: wgpu::Buffer,
    category_index: wgpu::Buffer,
    params: wgpu::Buffer,
    staging: wgpu::Buffer, // For reading back particles
    bind_group: wgpu::BindGroup,
}

impl ForceBuffers {
    fn new(
        ctx: &GpuContext,
        pipeline: &ForcePipeline,
        particles: &[Particle],
        field: &ForceField,
    ) -> Self {
        let storage = |label: &str, contents: &[u8], extra: wgpu::BufferUsages| {
            ctx.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | extra,
                })
        };

        let particles_buffer = storage(
            "Particles Buffer",
            &padded_bytes(particles),
            wgpu::BufferUsages::COPY_SRC,
        );
        let links = storage(
            "Links Buffer",
            &padded_bytes::<Link>(&field.links),
            wgpu::BufferUsages::empty(),
        );
        let link_index = storage(
            "Link Index Buffer",
            &padded_bytes::<u32>(&field.link_index),
            wgpu::BufferUsages::empty(),
        );
        let spans = storage(
            "Node Spans Buffer",
            &padded_bytes::<NodeSpan>(&field.spans),
            wgpu::BufferUsages::empty(),
        );
        let anchors = storage(
            "Anchors Buffer",
            &padded_bytes::<Anchor>(&field.anchors),
            wgpu::BufferUsages::empty(),
        );
        let category_index = storage(
            "Category Index Buffer",
            &padded_bytes::<u32>(&field.category_index),
            wgpu::BufferUsages::empty(),
        );

        let params = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Params Buffer"),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: std::mem::size_of_val(particles).max(std::mem::size_of::<Particle>()) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Force Bind Group"),
            layout: &pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particles_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: links.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: link_index.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: spans.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: anchors.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: category_index.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        Self {
            shape: BufferShape::of(particles, field),
            particles: particles_buffer,
            links,
            link_index,
            spans,
            anchors,
            category_index,
            params,
            staging,
            bind_group,
        }
    }

    /// Upload the current particles and field into buffers of the same shape.
    fn upload(&self, ctx: &GpuContext, particles: &[Particle], field: &ForceField) {
        let write = |buffer: &wgpu::Buffer, bytes: &[u8]| {
            if !bytes.is_empty() {
                ctx.queue.write_buffer(buffer, 0, bytes);
            }
        };
        write(&self.particles, bytemuck::cast_slice(particles));
        write(&self.links, bytemuck::cast_slice(&field.links));
        write(&self.link_index, bytemuck::cast_slice(&field.link_index));
        write(&self.spans, bytemuck::cast_slice(&field.spans));
        write(&self.anchors, bytemuck::cast_slice(&field.anchors));
        write(&self.category_index, bytemuck::cast_slice(&field.category_index));
    }

    fn update_params(&self, ctx: &GpuContext, params: &SimParams) {
        ctx.queue
            .write_buffer(&self.params, 0, bytemuck::bytes_of(params));
    }
}

/// Accumulate and integrate pipelines over one bind group layout.
struct ForcePipeline {
    accumulate: wgpu::ComputePipeline,
    integrate: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ForcePipeline {
    fn new(ctx: &GpuContext) -> Self {
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Force Shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(FORCE_SHADER)),
            });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Force Bind Group Layout"),
                    entries: &[
                        storage_entry(0, false), // particles
                        storage_entry(1, true),  // links
                        storage_entry(2, true),  // link_index
                        storage_entry(3, true),  // spans
                        storage_entry(4, true),  // anchors
                        storage_entry(5, true),  // category_index
                        wgpu::BindGroupLayoutEntry {
                            binding: 6,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Force Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let entry = |name: &'static str| {
            ctx.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(name),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some(name),
                    compilation_options: Default::default(),
                    cache: None,
                })
        };

        Self {
            accumulate: entry("accumulate"),
            integrate: entry("integrate"),
            bind_group_layout,
        }
    }
}

/// wgpu compute implementation of [`ForceBackend`].
pub struct GpuBackend {
    ctx: GpuContext,
    pipeline: ForcePipeline,
    buffers: Option<ForceBuffers>,
}

impl GpuBackend {
    /// Create a backend on the first high-performance adapter.
    pub async fn new() -> Result<Self> {
        let ctx = GpuContext::new().await?;
        let pipeline = ForcePipeline::new(&ctx);
        Ok(Self {
            ctx,
            pipeline,
            buffers: None,
        })
    }

    /// Blocking constructor for callers without an async runtime.
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Reuse the buffers when the graph shape is unchanged, otherwise reallocate.
    fn prepare(&mut self, particles: &[Particle], field: &ForceField) {
        let shape = BufferShape::of(particles, field);
        if let Some(buffers) = self.buffers.as_ref().filter(|b| b.shape == shape) {
            buffers.upload(&self.ctx, particles, field);
            return;
        }
        debug!(
            particles = shape.particles,
            links = shape.links,
            "gpu_buffers_allocated"
        );
        self.buffers = Some(ForceBuffers::new(&self.ctx, &self.pipeline, particles, field));
    }

    fn dispatch(&self, buffers: &ForceBuffers, node_count: u32, substeps: u32) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Layout Encoder"),
            });

        let workgroup_count = node_count.div_ceil(WORKGROUP_SIZE);
        for _ in 0..substeps {
            for (label, pipeline) in [
                ("Accumulate Pass", &self.pipeline.accumulate),
                ("Integrate Pass", &self.pipeline.integrate),
            ] {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(label),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &buffers.bind_group, &[]);
                pass.dispatch_workgroups(workgroup_count, 1, 1);
            }
        }

        let size = (buffers.shape.particles * std::mem::size_of::<Particle>()) as u64;
        encoder.copy_buffer_to_buffer(&buffers.particles, 0, &buffers.staging, 0, size);
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    /// Read particles back from the staging buffer (blocking).
    fn read_back(&self, buffers: &ForceBuffers, out: &mut [Particle]) -> Result<()> {
        let size = std::mem::size_of_val(out) as u64;
        let buffer_slice = buffers.staging.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();

        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below.
            let _ = tx.send(result);
        });

        self.ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| LayoutError::Readback("Channel closed".into()))?
            .map_err(|e| LayoutError::Readback(e.to_string()))?;

        {
            let data = buffer_slice.get_mapped_range();
            let particles: &[Particle] = bytemuck::cast_slice(&data);
            out.copy_from_slice(particles);
        }

        buffers.staging.unmap();
        Ok(())
    }
}

impl ForceBackend for GpuBackend {
    fn run_substeps(
        &mut self,
        particles: &mut [Particle],
        field: &ForceField,
        params: &SimParams,
        substeps: u32,
    ) -> Result<()> {
        if particles.is_empty() || substeps == 0 {
            return Ok(());
        }
        if field.spans.len() != particles.len() {
            return Err(LayoutError::Compute(format!(
                "force field indexes {} nodes, got {} particles",
                field.spans.len(),
                particles.len()
            )));
        }

        self.prepare(particles, field);
        let Some(buffers) = self.buffers.as_ref() else {
            return Err(LayoutError::ResourceCreation("buffers missing".into()));
        };
        buffers.update_params(&self.ctx, params);
        self.dispatch(buffers, particles.len() as u32, substeps);
        self.read_back(buffers, particles)
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}
