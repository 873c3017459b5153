//! The collision compute shader and its buffer plumbing.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::backend::{CollisionBackend, CollisionFrame};
use crate::error::GpuError;
use crate::gpu::GpuContext;

const WORKGROUP_SIZE: u32 = 256;

/// WGSL source for the per-particle collision resolution pass.
///
/// Each invocation handles one particle: it walks the grouped indices of
/// its own cell, accumulates a positional correction against every
/// overlapping neighbor, and writes its corrected position to a separate
/// output buffer. Reading from the input snapshot only keeps the pass free
/// of cross-invocation hazards and bit-identical to the local gather path.
pub const COLLIDE_WGSL: &str = r#"
struct Params {
    cell_width: f32,
    cell_count_x: u32,
    cell_count_y: u32,
    particle_count: u32,
};

@group(0) @binding(0) var<storage, read> positions_in: array<vec2<f32>>;
@group(0) @binding(1) var<storage, read_write> positions_out: array<vec2<f32>>;
@group(0) @binding(2) var<storage, read> radii: array<f32>;
@group(0) @binding(3) var<storage, read> cell_starts: array<u32>;
@group(0) @binding(4) var<storage, read> grouped: array<u32>;
@group(0) @binding(5) var<uniform> params: Params;

const RESTITUTION: f32 = 0.75;
const MIN_DISTANCE: f32 = 1e-6;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if i >= params.particle_count {
        return;
    }

    var pos = positions_in[i];
    let r1 = radii[i];

    // Cell of own center, floored and clamped like the CPU builder.
    let cell_x = clamp(i32(floor(pos.x / params.cell_width)), 0, i32(params.cell_count_x) - 1);
    let cell_y = clamp(i32(floor(pos.y / params.cell_width)), 0, i32(params.cell_count_y) - 1);
    let h = u32(cell_y) * params.cell_count_x + u32(cell_x);

    let start = cell_starts[h];
    let end = cell_starts[h + 1u];

    for (var k = start; k < end; k++) {
        let j = grouped[k];
        if j == i {
            continue;
        }

        let axis = positions_in[i] - positions_in[j];
        let distance = length(axis);
        let sum_of_radii = r1 + radii[j];

        if distance < sum_of_radii && distance > MIN_DISTANCE {
            let n = axis / distance;
            let ratio_other = radii[j] / sum_of_radii;
            pos += n * (ratio_other * RESTITUTION * (sum_of_radii - distance));
        }
    }

    positions_out[i] = pos;
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Params {
    cell_width: f32,
    cell_count_x: u32,
    cell_count_y: u32,
    particle_count: u32,
}

/// Collision resolution offloaded to a wgpu compute pipeline.
///
/// Buffers are sized on first use and re-created whenever the particle
/// count or cell count outgrows them (spawns happen between updates, so the
/// count can only grow). Each [`resolve`](CollisionBackend::resolve) call
/// uploads the snapshot, dispatches one pass, and blocks on readback.
pub struct GpuCollider {
    ctx: GpuContext,
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    buffers: Option<FrameBuffers>,
}

struct FrameBuffers {
    positions_in: wgpu::Buffer,
    positions_out: wgpu::Buffer,
    radii: wgpu::Buffer,
    cell_starts: wgpu::Buffer,
    grouped: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    particle_capacity: usize,
    starts_capacity: usize,
}

impl GpuCollider {
    /// Create a collider on a fresh headless device.
    pub fn new() -> Result<Self, GpuError> {
        Self::with_context(GpuContext::new()?)
    }

    /// Create a collider on an existing device.
    pub fn with_context(ctx: GpuContext) -> Result<Self, GpuError> {
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Collide Shader"),
                source: wgpu::ShaderSource::Wgsl(COLLIDE_WGSL.into()),
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Collide Pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

        let params_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Collide Params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            ctx,
            pipeline,
            params_buffer,
            buffers: None,
        })
    }

    fn ensure_buffers(&mut self, particle_count: usize, starts_len: usize) {
        let fits = self.buffers.as_ref().is_some_and(|b| {
            b.particle_capacity >= particle_count && b.starts_capacity >= starts_len
        });
        if fits {
            return;
        }

        let device = &self.ctx.device;
        let position_bytes = (particle_count * std::mem::size_of::<Vec2>()) as u64;
        let index_bytes = (particle_count * std::mem::size_of::<u32>()) as u64;
        let starts_bytes = (starts_len * std::mem::size_of::<u32>()) as u64;

        let positions_in = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Positions In"),
            size: position_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let positions_out = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Positions Out"),
            size: position_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let radii = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Radii"),
            size: index_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let cell_starts = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cell Starts"),
            size: starts_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let grouped = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grouped Indices"),
            size: index_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Positions Staging"),
            size: position_bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Collide Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: positions_in.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: positions_out.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: radii.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: cell_starts.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: grouped.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 5, resource: self.params_buffer.as_entire_binding() },
            ],
        });

        self.buffers = Some(FrameBuffers {
            positions_in,
            positions_out,
            radii,
            cell_starts,
            grouped,
            staging,
            bind_group,
            particle_capacity: particle_count,
            starts_capacity: starts_len,
        });
    }
}

impl CollisionBackend for GpuCollider {
    fn resolve(&mut self, frame: CollisionFrame<'_>) {
        let particle_count = frame.positions.len();
        if particle_count == 0 {
            return;
        }

        self.ensure_buffers(particle_count, frame.starts.len());
        let buffers = self.buffers.as_ref().expect("buffers just ensured");

        let params = Params {
            cell_width: frame.geom.cell_width,
            cell_count_x: frame.geom.cell_count_x,
            cell_count_y: frame.geom.cell_count_y,
            particle_count: particle_count as u32,
        };

        let queue = &self.ctx.queue;
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
        queue.write_buffer(&buffers.positions_in, 0, bytemuck::cast_slice(&*frame.positions));
        queue.write_buffer(&buffers.radii, 0, bytemuck::cast_slice(frame.radii));
        queue.write_buffer(&buffers.cell_starts, 0, bytemuck::cast_slice(frame.starts));
        queue.write_buffer(&buffers.grouped, 0, bytemuck::cast_slice(frame.grouped));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Collide Encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Collide Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.dispatch_workgroups((particle_count as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }

        let result_bytes = (particle_count * std::mem::size_of::<Vec2>()) as u64;
        encoder.copy_buffer_to_buffer(
            &buffers.positions_out,
            0,
            &buffers.staging,
            0,
            result_bytes,
        );

        queue.submit(Some(encoder.finish()));

        // Blocking readback: dispatched work runs to completion before the
        // scheduler continues.
        let slice = buffers.staging.slice(..result_bytes);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        self.ctx.device.poll(wgpu::Maintain::Wait);

        {
            let data = slice.get_mapped_range();
            frame.positions.copy_from_slice(bytemuck::cast_slice(&data));
        }
        buffers.staging.unmap();
    }
}
