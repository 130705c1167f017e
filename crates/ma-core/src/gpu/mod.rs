//! wgpu compute backend.
//!
//! The backend owns the accelerator context (adapter, device, queue and the
//! compiled addition pipeline). Buffers are created per call and dropped
//! before `add` returns.

use std::mem::size_of;
use std::sync::mpsc;

use pollster::block_on;
use tracing::{debug, info};

use crate::backend::{check_operands, AddBackend};
use crate::dims::Dims;
use crate::error::{MatAddError, Result};

const ADD_SHADER: &str = include_str!("add.wgsl");

/// Workgroup edge length. Must match `@workgroup_size` in `add.wgsl`.
pub const WORKGROUP_SIZE: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    dx: u32,
    dy: u32,
    _pad: [u32; 2],
}

/// Options for selecting the accelerator adapter.
#[derive(Debug, Clone, Default)]
pub struct WgpuOptions {
    /// Request wgpu's fallback (software) adapter instead of a hardware one.
    pub force_fallback_adapter: bool,
}

/// Accelerator backend running the addition kernel through wgpu.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    adapter_info: wgpu::AdapterInfo,
}

impl WgpuBackend {
    /// Create the accelerator context and compile the addition kernel.
    ///
    /// # Errors
    /// Returns `NoAdapter` if no adapter matches `options`, `DeviceRequest`
    /// if the device cannot be opened, and `Dispatch` if the kernel fails to
    /// compile.
    pub fn new(options: &WgpuOptions) -> Result<Self> {
        block_on(Self::new_async(options))
    }

    async fn new_async(options: &WgpuOptions) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .map_err(|e| MatAddError::NoAdapter(e.to_string()))?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("MatAddDevice"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| MatAddError::DeviceRequest(e.to_string()))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MatAddBindGroupLayout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("MatAddPipelineLayout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("MatAddShader"),
            source: wgpu::ShaderSource::Wgsl(ADD_SHADER.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("MatAddPipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("add_kernel"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(MatAddError::Dispatch(format!(
                "failed to build addition pipeline: {}",
                err
            )));
        }

        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "accelerator context ready"
        );

        Ok(WgpuBackend {
            device,
            queue,
            pipeline,
            bind_group_layout,
            adapter_info,
        })
    }

    /// Name of the adapter the device was opened on.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Workgroup counts `(x, y)` covering `dims` with `WORKGROUP_SIZE` tiles.
    pub fn grid_for(dims: Dims) -> Result<(u32, u32)> {
        let dx = to_u32("matrix width", dims.dx())?;
        let dy = to_u32("matrix height", dims.dy())?;
        Ok((dx.div_ceil(WORKGROUP_SIZE), dy.div_ceil(WORKGROUP_SIZE)))
    }

    fn check_limits(&self, bytes: u64, groups: (u32, u32)) -> Result<()> {
        let limits = self.device.limits();
        let binding_limit = u64::from(limits.max_storage_buffer_binding_size);
        if bytes > binding_limit {
            return Err(MatAddError::DeviceLimit {
                what: "storage binding size",
                requested: bytes,
                limit: binding_limit,
            });
        }
        if bytes > limits.max_buffer_size {
            return Err(MatAddError::DeviceLimit {
                what: "buffer size",
                requested: bytes,
                limit: limits.max_buffer_size,
            });
        }
        let max_groups = limits.max_compute_workgroups_per_dimension;
        let widest = groups.0.max(groups.1);
        if widest > max_groups {
            return Err(MatAddError::DeviceLimit {
                what: "workgroups per dimension",
                requested: u64::from(widest),
                limit: u64::from(max_groups),
            });
        }
        Ok(())
    }

    fn run(&self, a: &[f32], b: &[f32], out: &mut [f32], dims: Dims) -> Result<()> {
        let (groups_x, groups_y) = Self::grid_for(dims)?;
        let bytes = dims
            .len()
            .checked_mul(size_of::<f32>())
            .ok_or(MatAddError::SizeOverflow {
                dx: dims.dx(),
                dy: dims.dy(),
            })? as u64;
        self.check_limits(bytes, (groups_x, groups_y))?;

        let params = Params {
            dx: to_u32("matrix width", dims.dx())?,
            dy: to_u32("matrix height", dims.dy())?,
            _pad: [0; 2],
        };

        debug!(dims = %dims, bytes, "allocating accelerator buffers");

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let lhs_buffer = self.storage_buffer("MatAddLhs", bytes, wgpu::BufferUsages::COPY_DST);
        let rhs_buffer = self.storage_buffer("MatAddRhs", bytes, wgpu::BufferUsages::COPY_DST);
        let result_buffer =
            self.storage_buffer("MatAddResult", bytes, wgpu::BufferUsages::COPY_SRC);
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MatAddStaging"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MatAddParams"),
            size: size_of::<Params>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let validation = block_on(self.device.pop_error_scope());
        let out_of_memory = block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(MatAddError::DeviceAlloc(err.to_string()));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Host-to-device uploads are ordered before the compute pass on the queue.
        self.queue.write_buffer(&lhs_buffer, 0, bytemuck::cast_slice(a));
        self.queue.write_buffer(&rhs_buffer, 0, bytemuck::cast_slice(b));
        self.queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MatAddBindGroup"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lhs_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: rhs_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("MatAddEncoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("MatAddPass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            debug!(groups_x, groups_y, "dispatching addition kernel");
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        encoder.copy_buffer_to_buffer(&result_buffer, 0, &staging_buffer, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        if let Some(err) = block_on(self.device.pop_error_scope()) {
            return Err(MatAddError::Dispatch(err.to_string()));
        }

        let slice = staging_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| MatAddError::Dispatch(e.to_string()))?;
        rx.recv()
            .map_err(|e| MatAddError::Readback(e.to_string()))?
            .map_err(|e| MatAddError::Readback(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data));
        }
        staging_buffer.unmap();
        Ok(())
    }

    fn storage_buffer(&self, label: &str, bytes: u64, extra: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | extra,
            mapped_at_creation: false,
        })
    }
}

impl AddBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn add(&self, a: &[f32], b: &[f32], out: &mut [f32], dims: Dims) -> Result<()> {
        check_operands(a, b, out, dims)?;
        self.run(a, b, out, dims)
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn to_u32(what: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| MatAddError::DeviceLimit {
        what,
        requested: value as u64,
        limit: u64::from(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;
    use crate::matrix::Matrix;
    use crate::verify::{verify, DEFAULT_TOLERANCE};

    /// Open the accelerator, or `None` on machines without a usable adapter.
    fn backend() -> Option<WgpuBackend> {
        match WgpuBackend::new(&WgpuOptions::default()) {
            Ok(b) => Some(b),
            Err(e) => {
                eprintln!("skipping accelerator test: {}", e);
                None
            }
        }
    }

    fn ramp(dims: Dims, scale: f32) -> Matrix {
        let data = (0..dims.len()).map(|i| i as f32 * scale).collect();
        Matrix::from_vec(data, dims).unwrap()
    }

    fn assert_matches_host(gpu: &WgpuBackend, a: &Matrix, b: &Matrix) {
        let dims = a.dims();
        let mut check = Matrix::zeros(dims).unwrap();
        let mut c = Matrix::filled(dims, f32::NAN).unwrap();
        a.add_into(b, &mut check, &CpuBackend::new()).unwrap();
        a.add_into(b, &mut c, gpu).unwrap();
        let report = verify(&check, &c, DEFAULT_TOLERANCE).unwrap();
        assert!(report.passed(), "{} for {}", report, dims);
    }

    #[test]
    fn test_grid_rounds_up() {
        assert_eq!(WgpuBackend::grid_for(Dims::new(1, 1).unwrap()).unwrap(), (1, 1));
        assert_eq!(WgpuBackend::grid_for(Dims::new(16, 16).unwrap()).unwrap(), (1, 1));
        assert_eq!(WgpuBackend::grid_for(Dims::new(17, 5).unwrap()).unwrap(), (2, 1));
        assert_eq!(
            WgpuBackend::grid_for(Dims::new(1024, 1024).unwrap()).unwrap(),
            (64, 64)
        );
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(size_of::<Params>(), 16);
    }

    #[test]
    fn test_constant_fill_4x4() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::square(4).unwrap();
        let a = Matrix::filled(dims, 3.0).unwrap();
        let b = Matrix::filled(dims, 2.0).unwrap();
        let mut c = Matrix::zeros(dims).unwrap();
        a.add_into(&b, &mut c, &gpu).unwrap();
        assert!(c.as_slice().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_single_cell() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::new(1, 1).unwrap();
        assert_matches_host(
            &gpu,
            &Matrix::filled(dims, 0.25).unwrap(),
            &Matrix::filled(dims, -4.0).unwrap(),
        );
    }

    #[test]
    fn test_partial_workgroups() {
        let Some(gpu) = backend() else { return };
        for (dx, dy) in [(17, 5), (5, 17), (1, 33), (31, 1)] {
            let dims = Dims::new(dx, dy).unwrap();
            assert_matches_host(&gpu, &ramp(dims, 1.0), &ramp(dims, 0.5));
        }
    }

    #[test]
    fn test_default_dims() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::default();
        assert_matches_host(&gpu, &ramp(dims, 1e-3), &Matrix::filled(dims, 2.0).unwrap());
    }

    #[test]
    fn test_repeated_calls() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::new(8, 3).unwrap();
        for fill in [1.0, -7.5, 100.0] {
            assert_matches_host(
                &gpu,
                &Matrix::filled(dims, fill).unwrap(),
                &ramp(dims, 2.0),
            );
        }
    }

    #[test]
    fn test_overflow_matches_host() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::new(3, 3).unwrap();
        let big = Matrix::filled(dims, 3e38).unwrap();
        assert_matches_host(&gpu, &big, &big);
    }

    #[test]
    fn test_operand_length_mismatch() {
        let Some(gpu) = backend() else { return };
        let dims = Dims::new(2, 2).unwrap();
        let mut out = [0.0; 4];
        assert!(matches!(
            gpu.add(&[1.0; 3], &[1.0; 4], &mut out, dims),
            Err(MatAddError::ShapeMismatch { .. })
        ));
    }
}
