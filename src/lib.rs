//! Fixed-arity GPU compute operations on top of wgpu.
//!
//! An operation such as [`OpMult`] checks the memory objects it is given,
//! rebuilds a shared [`Algorithm`] with them and its embedded SPIR-V kernel,
//! and can then be recorded into a [`Sequence`] any number of times.

pub use vkop_core::{ContextOptions, DeviceBindError, GpuContext};
pub use vkop_core::types::{BufferKind, CommandRecorder, DispatchTarget, Memory, MemoryHandle};
pub use memory::{BufferId, MemoryManager};
pub use vkop_ops::{
    FixedArityKernel, FixedArityOperation, KernelImage, MultKernel, OpError, OpMult, OpRegistry,
    RecordDispatch,
};
pub use execution::{Algorithm, KernelManager, Sequence};
