use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use vkop_core::{
    GpuContext, DeviceBindError,
    types::{AbstractBuffer, AbstractComputePipeline, BufferKind, DispatchTarget, Memory, MemoryHandle},
    wgpu::{BindGroup, CommandEncoder, ComputePassDescriptor},
};

use crate::kernel_manager::KernelManager;

/// Must match the `@workgroup_size` the kernels are written with.
pub const DEFAULT_WORKGROUP_SIZE: u32 = 64;

const ELEMENT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

struct BoundState {
    pipeline:    Arc<AbstractComputePipeline>,
    bind_group:  BindGroup,
    workgroups:  (u32, u32, u32),
    // keeps the bound buffers alive for as long as they are bound
    _mem_objects: Vec<MemoryHandle>,
}

/// wgpu-backed [`DispatchTarget`]: a compute pipeline plus the bind group of
/// the memory objects it was last rebuilt with.
pub struct Algorithm {
    ctx:            GpuContext,
    kernels:        Arc<KernelManager>,
    workgroup_size: u32,
    state:          Mutex<Option<BoundState>>,
}

impl Algorithm {
    pub fn new(ctx: GpuContext) -> Self {
        let kernels = Arc::new(KernelManager::new(ctx.clone()));
        Self::with_kernels(ctx, kernels)
    }

    /// Share a pipeline cache between several algorithms.
    pub fn with_kernels(ctx: GpuContext, kernels: Arc<KernelManager>) -> Self {
        Self {
            ctx,
            kernels,
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            state: Mutex::new(None),
        }
    }

    pub fn with_workgroup_size(mut self, workgroup_size: u32) -> Self {
        self.workgroup_size = workgroup_size.max(1);
        self
    }

    pub fn is_built(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Workgroups of the next dispatch, if built.
    pub fn workgroups(&self) -> Option<(u32, u32, u32)> {
        self.state.lock().as_ref().map(|s| s.workgroups)
    }
}

/// Every memory object must be a non-empty device storage buffer.
fn storage_buffers(mem_objects: &[MemoryHandle]) -> Result<Vec<&AbstractBuffer>, DeviceBindError> {
    if mem_objects.is_empty() {
        return Err(DeviceBindError::NoMemoryObjects);
    }
    mem_objects
        .iter()
        .enumerate()
        .map(|(index, mem)| {
            if mem.kind() != BufferKind::Main {
                return Err(DeviceBindError::IncompatibleMemory { index, kind: mem.kind() });
            }
            if mem.size() == 0 {
                return Err(DeviceBindError::EmptyMemory { index });
            }
            mem.as_buffer().ok_or(DeviceBindError::UnsupportedMemory { index })
        })
        .collect()
}

impl DispatchTarget for Algorithm {
    fn rebuild(&self, mem_objects: &[MemoryHandle], spirv: &[u32]) -> Result<(), DeviceBindError> {
        trace!("rebuilding algorithm with {} mem objects, {} spirv words", mem_objects.len(), spirv.len());

        let buffers = storage_buffers(mem_objects)?;
        // one invocation per element of the first memory object
        let workgroups = self.ctx.dispatch_size_1d(mem_objects[0].size() / ELEMENT_SIZE, self.workgroup_size)?;
        let (pipeline, layout) = self.kernels.get(spirv, buffers.len())?;
        let bind_group = self.ctx.capture_validation("bind group", |ctx| {
            ctx.create_storage_bind_group(&layout, &buffers)
        })?;

        *self.state.lock() = Some(BoundState {
            pipeline,
            bind_group,
            workgroups,
            _mem_objects: mem_objects.to_vec(),
        });
        Ok(())
    }

    fn encode(&self, encoder: &mut CommandEncoder) -> Result<(), DeviceBindError> {
        let state = self.state.lock();
        let state = state.as_ref().ok_or(DeviceBindError::NotBuilt)?;
        let (x, y, z) = state.workgroups;
        trace!("encoding dispatch ({x},{y},{z})");

        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor::default());
        pass.set_pipeline(state.pipeline.raw());
        pass.set_bind_group(0, &state.bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);
        Ok(())
    }
}
