//! Host-only stand-ins for the device collaborators.

use std::sync::Arc;

use parking_lot::Mutex;
use vkop_core::types::{BufferKind, CommandRecorder, DispatchTarget, Memory, MemoryHandle};
use vkop_core::wgpu::CommandEncoder;
use vkop_core::DeviceBindError;

#[derive(Debug)]
pub struct FakeMemory {
    size: u64,
}

impl FakeMemory {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

impl Memory for FakeMemory {
    fn size(&self) -> u64 {
        self.size
    }

    fn kind(&self) -> BufferKind {
        BufferKind::Main
    }
}

pub fn handles(n: usize) -> Vec<MemoryHandle> {
    (0..n)
        .map(|_| Arc::new(FakeMemory::new(16)) as MemoryHandle)
        .collect()
}

#[derive(Clone)]
pub struct RebuildCall {
    pub mem_objects: Vec<MemoryHandle>,
    pub spirv:       Vec<u32>,
}

/// Records every rebuild; optionally rejects them all.
#[derive(Default)]
pub struct FakeAlgorithm {
    calls: Mutex<Vec<RebuildCall>>,
    built: Mutex<bool>,
    fail:  bool,
}

impl FakeAlgorithm {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn failure() -> DeviceBindError {
        DeviceBindError::IncompatibleMemory { index: 2, kind: BufferKind::Download }
    }

    pub fn calls(&self) -> Vec<RebuildCall> {
        self.calls.lock().clone()
    }

    pub fn is_built(&self) -> bool {
        *self.built.lock()
    }
}

impl DispatchTarget for FakeAlgorithm {
    fn rebuild(&self, mem_objects: &[MemoryHandle], spirv: &[u32]) -> Result<(), DeviceBindError> {
        self.calls.lock().push(RebuildCall {
            mem_objects: mem_objects.to_vec(),
            spirv:       spirv.to_vec(),
        });
        if self.fail {
            return Err(Self::failure());
        }
        *self.built.lock() = true;
        Ok(())
    }

    fn encode(&self, _encoder: &mut CommandEncoder) -> Result<(), DeviceBindError> {
        if self.is_built() { Ok(()) } else { Err(DeviceBindError::NotBuilt) }
    }
}

/// Counts dispatches instead of encoding them.
#[derive(Default)]
pub struct FakeRecorder {
    pub recorded: usize,
}

impl CommandRecorder for FakeRecorder {
    fn record_dispatch(&mut self, _target: &dyn DispatchTarget) -> Result<(), DeviceBindError> {
        self.recorded += 1;
        Ok(())
    }
}
