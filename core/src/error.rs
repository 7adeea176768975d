use thiserror::Error;

use crate::types::BufferKind;

/// Errors raised while binding memory objects and kernels on the device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceBindError {
    #[error("no memory objects to bind")]
    NoMemoryObjects,

    #[error("memory object {index} is a {kind} buffer and cannot be bound as storage")]
    IncompatibleMemory { index: usize, kind: BufferKind },

    #[error("memory object {index} is not backed by a device buffer")]
    UnsupportedMemory { index: usize },

    #[error("memory object {index} is empty")]
    EmptyMemory { index: usize },

    #[error("{elements} elements need {workgroups} workgroups, the device allows {max} per dimension")]
    DispatchTooLarge { elements: u64, workgroups: u64, max: u32 },

    #[error("dispatch target has not been built")]
    NotBuilt,

    #[error("device rejected {label}: {message}")]
    Validation { label: String, message: String },
}
