pub mod config;
pub mod error;
pub mod types;

pub use wgpu;

use anyhow::{ensure, Result};
use log::{info, trace};
use std::borrow::Cow;
use std::sync::{mpsc, Arc};
use wgpu::{
    util::DeviceExt, BindGroupLayoutDescriptor, BindGroupLayoutEntry, ShaderStages,
    CommandEncoder, CommandEncoderDescriptor, Device, ErrorFilter, Instance, PollType,
    ComputePipelineDescriptor, PipelineLayoutDescriptor, Queue, ShaderModule,
    ShaderModuleDescriptor, ShaderSource, PipelineCompilationOptions, BindGroup,
    BindGroupEntry, BindGroupDescriptor,
};

pub use config::ContextOptions;
pub use error::DeviceBindError;
use types::{AbstractBuffer, AbstractBindGroupLayout, AbstractComputePipeline, BufferKind};

/// Entry point every kernel image is compiled with.
pub const KERNEL_ENTRY_POINT: &str = "main";

/// Context for GPU operations
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue:  Arc<Queue>,
}

impl GpuContext {
    /* ------------------------------------------------------------------ */
    /* Construction                                                       */
    /* ------------------------------------------------------------------ */
    pub async fn new() -> Result<Self> {
        Self::with_options(ContextOptions::from_env()).await
    }

    pub async fn with_options(opts: ContextOptions) -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference:       opts.power_preference,
                force_fallback_adapter: opts.force_fallback_adapter,
                compatible_surface:     None,
            })
            .await
            .map_err(|e| anyhow::anyhow!("No suitable adapter found: {}", e))?;

        let adapter_info = adapter.get_info();
        info!("using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: opts.label.as_deref(),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /* ------------------------------------------------------------------ */
    /* Buffers                                                            */
    /* ------------------------------------------------------------------ */

    /// Allocate an uninitialised GPU buffer.
    pub fn create_buffer(&self, size: u64, kind: BufferKind) -> AbstractBuffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: kind.into(),
            mapped_at_creation: false,
        });
        AbstractBuffer { buffer, kind }
    }

    /// Allocate and initialise a GPU buffer from host data.
    pub fn create_buffer_with_data(&self, data: &[u8], kind: BufferKind) -> AbstractBuffer {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: data,
            usage: kind.into(),
        });
        AbstractBuffer { buffer, kind }
    }

    /// Blocking write: map-write, copy `data`, unmap.
    pub fn write_buffer(&self, buffer: &AbstractBuffer, data: &[u8]) -> Result<()> {
        ensure!(!data.is_empty(), "cannot map an empty range for writing");
        let wgpu_buffer = buffer.raw();
        let slice = wgpu_buffer.slice(..data.len() as u64);
        self.map_blocking(&slice, wgpu::MapMode::Write)?;
        slice.get_mapped_range_mut().copy_from_slice(data);
        wgpu_buffer.unmap();
        Ok(())
    }

    /// Blocking read: map-read entire buffer, return Vec<u8>.
    pub fn read_buffer(&self, buffer: &AbstractBuffer) -> Result<Vec<u8>> {
        ensure!(buffer.size() > 0, "cannot map an empty buffer for reading");
        let wgpu_buffer = buffer.raw();
        let slice = wgpu_buffer.slice(..);
        self.map_blocking(&slice, wgpu::MapMode::Read)?;
        let data = slice.get_mapped_range().to_vec();
        wgpu_buffer.unmap();
        Ok(data)
    }

    fn map_blocking(&self, slice: &wgpu::BufferSlice<'_>, mode: wgpu::MapMode) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        slice.map_async(mode, move |res| {
            let _ = tx.send(res);
        });
        self.wait_idle()?;
        rx.recv()??;
        Ok(())
    }

    /* ------------------------------------------------------------------ */
    /* Encoder helpers                                                    */
    /* ------------------------------------------------------------------ */
    pub fn create_encoder(&self, label: &str) -> CommandEncoder {
        self.device
            .create_command_encoder(&CommandEncoderDescriptor { label: Some(label) })
    }

    pub fn submit_encoder(&self, encoder: CommandEncoder) {
        self.queue.submit(Some(encoder.finish()));
    }

    pub fn copy_buffer_to_buffer(&self, src: &AbstractBuffer, dst: &AbstractBuffer, size: u64) {
        let mut enc = self.create_encoder("copy-b2b");
        enc.copy_buffer_to_buffer(src.raw(), 0, dst.raw(), 0, size);
        self.submit_encoder(enc);
    }

    /* ------------------------------------------------------------------ */
    /* Pipelines                                                          */
    /* ------------------------------------------------------------------ */

    /// Create a layout of `n_bindings` read-write storage buffers.
    pub fn create_storage_layout(&self, n_bindings: usize) -> Arc<AbstractBindGroupLayout> {
        let entries: Vec<BindGroupLayoutEntry> = (0..n_bindings)
            .map(|i| BindGroupLayoutEntry {
                binding: i as u32,
                visibility: ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bgl = self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("storage-layout"),
            entries: &entries,
        });
        Arc::new(AbstractBindGroupLayout(bgl))
    }

    /// Create a compute pipeline from SPIR-V words.
    pub fn create_spirv_pipeline(
        &self,
        spirv: &[u32],
        entry: &str,
        layout: &AbstractBindGroupLayout,
    ) -> Arc<AbstractComputePipeline> {
        let module: ShaderModule = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("spirv-module"),
            source: ShaderSource::SpirV(Cow::Borrowed(spirv)),
        });
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("compute-pl-layout"),
            bind_group_layouts: &[&layout.0],
            push_constant_ranges: &[],
        });
        let pipeline = self.device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("compute-pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry),
            compilation_options: PipelineCompilationOptions::default(),
            cache: None,
        });
        Arc::new(AbstractComputePipeline(pipeline))
    }

    /// Bind `buffers` in order to consecutive bindings of `layout`.
    pub fn create_storage_bind_group(
        &self,
        layout: &AbstractBindGroupLayout,
        buffers: &[&AbstractBuffer],
    ) -> BindGroup {
        let entries: Vec<BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, b)| BindGroupEntry {
                binding: i as u32,
                resource: b.buffer.as_entire_binding(),
            })
            .collect();
        self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("storage-bg"),
            layout: &layout.0,
            entries: &entries,
        })
    }

    /// Run `f` inside a validation error scope, turning any captured device
    /// error into [`DeviceBindError::Validation`].
    pub fn capture_validation<T>(
        &self,
        label: &str,
        f: impl FnOnce(&Self) -> T,
    ) -> Result<T, DeviceBindError> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let out = f(self);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(out),
            Some(err) => {
                trace!("validation scope '{}' captured: {}", label, err);
                Err(DeviceBindError::Validation {
                    label: label.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /* ------------------------------------------------------------------ */
    /* Misc utils                                                         */
    /* ------------------------------------------------------------------ */

    /// Block until all submitted work has completed.
    pub fn wait_idle(&self) -> Result<()> {
        self.device
            .poll(PollType::Wait)
            .map_err(|e| anyhow::anyhow!("Device poll failed: {}", e))?;
        Ok(())
    }

    /// Helper: compute `(x,1,1)` for 1-D dispatch with `workgroup_size`,
    /// within this device's workgroup limit.
    pub fn dispatch_size_1d(&self, total: u64, workgroup_size: u32) -> Result<(u32, u32, u32), DeviceBindError> {
        let max = self.device.limits().max_compute_workgroups_per_dimension;
        dispatch_size_within(total, workgroup_size, max)
    }
}

/// `(x,1,1)` covering `total` invocations, or an error when `x` exceeds `max`.
pub fn dispatch_size_within(total: u64, workgroup_size: u32, max: u32) -> Result<(u32, u32, u32), DeviceBindError> {
    let workgroups = total.div_ceil(u64::from(workgroup_size.max(1)));
    if workgroups > u64::from(max) {
        return Err(DeviceBindError::DispatchTooLarge { elements: total, workgroups, max });
    }
    Ok((workgroups as u32, 1, 1))
}
