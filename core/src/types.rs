use std::fmt;
use std::sync::Arc;
use wgpu::{Buffer, BufferUsages, BindGroupLayout, CommandEncoder, ComputePipeline};

use crate::error::DeviceBindError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Main,
    Upload,
    Download,
}
impl From<BufferKind> for BufferUsages {
    fn from(kind: BufferKind) -> Self {
        match kind {
            BufferKind::Main => BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            BufferKind::Upload => BufferUsages::MAP_WRITE | BufferUsages::COPY_SRC,
            BufferKind::Download => BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        }
    }
}
impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Main => f.write_str("storage"),
            BufferKind::Upload => f.write_str("upload staging"),
            BufferKind::Download => f.write_str("download staging"),
        }
    }
}

/// A memory object taking part in a compute operation.
///
/// Operations only pass these through to a [`DispatchTarget`]; they never
/// read, write or free them.
pub trait Memory: fmt::Debug + Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    fn kind(&self) -> BufferKind;

    /// The device buffer backing this memory, if there is one.
    fn as_buffer(&self) -> Option<&AbstractBuffer> {
        None
    }
}

/// Shared, non-owning (from the operation's point of view) memory reference.
pub type MemoryHandle = Arc<dyn Memory>;

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractBuffer {
    pub(crate) buffer: Buffer,
    pub(crate) kind: BufferKind,
}
impl AbstractBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

impl Memory for AbstractBuffer {
    fn size(&self) -> u64 {
        self.buffer.size()
    }

    fn kind(&self) -> BufferKind {
        self.kind
    }

    fn as_buffer(&self) -> Option<&AbstractBuffer> {
        Some(self)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractBindGroupLayout(pub(crate) BindGroupLayout);
impl AbstractBindGroupLayout {
    pub fn raw(&self) -> &wgpu::BindGroupLayout {
        &self.0
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractComputePipeline(pub(crate) ComputePipeline);
impl AbstractComputePipeline {
    pub fn raw(&self) -> &wgpu::ComputePipeline {
        &self.0
    }
}

/// Owner of a compute pipeline and its descriptor bindings.
///
/// Implementations are shared behind an `Arc` by every operation that
/// rebinds them, so all methods take `&self`.
pub trait DispatchTarget: Send + Sync {
    /// Rebuild the pipeline and bindings for `mem_objects` and the SPIR-V
    /// `spirv` words. On error the previously bound state is left untouched.
    fn rebuild(&self, mem_objects: &[MemoryHandle], spirv: &[u32]) -> Result<(), DeviceBindError>;

    /// Append a dispatch of the currently bound pipeline to `encoder`.
    fn encode(&self, encoder: &mut CommandEncoder) -> Result<(), DeviceBindError>;
}

/// A command-recording context that dispatches can be appended to.
pub trait CommandRecorder {
    fn record_dispatch(&mut self, target: &dyn DispatchTarget) -> Result<(), DeviceBindError>;
}
