use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;
use vkop_core::types::{CommandRecorder, DispatchTarget, MemoryHandle};
use vkop_core::DeviceBindError;

use crate::kernel::KernelImage;
use crate::types::{OpError, RegistrationInfo};


/// A compute kernel that always binds the same number of memory objects.
pub trait FixedArityKernel: RegistrationInfo + 'static {
    /// Number of memory objects, in binding order
    const ARITY: usize;

    /// The embedded SPIR-V image
    const IMAGE: KernelImage;
}

/// Something that can append its dispatch to a command-recording context.
pub trait RecordDispatch: Send + Sync {
    fn name(&self) -> &'static str;

    fn record(&self, recorder: &mut dyn CommandRecorder) -> Result<(), DeviceBindError>;
}


/// Binds `K::ARITY` memory objects and the kernel of `K` to a shared
/// dispatch target.
///
/// All the work happens in [`FixedArityOperation::new`]; afterwards the
/// operation only remembers which target to dispatch. Dropping it never
/// touches the memory objects or the target.
///
/// Operations cannot be duplicated, since each one stands for exactly one
/// rebuild of its target:
///
/// ```compile_fail
/// use vkop_ops::OpMult;
///
/// fn duplicate(op: &OpMult) -> OpMult {
///     op.clone()
/// }
/// ```
pub struct FixedArityOperation<K: FixedArityKernel> {
    algorithm: Arc<dyn DispatchTarget>,
    _kernel:   PhantomData<fn() -> K>,
}

impl<K: FixedArityKernel> FixedArityOperation<K> {
    /// Check the arity of `mem_objects` and rebuild `algorithm` with them
    /// and the kernel of `K`.
    ///
    /// # Panics
    ///
    /// If the embedded kernel image is not a whole number of instruction
    /// words. This is checked before `algorithm` is touched.
    pub fn new(
        mem_objects: &[MemoryHandle],
        algorithm:   Arc<dyn DispatchTarget>,
    ) -> Result<Self, OpError> {
        debug!("{} constructor with {} mem objects", K::NAME, mem_objects.len());

        if mem_objects.len() != K::ARITY {
            return Err(OpError::InvalidArity {
                op:       K::NAME,
                expected: K::ARITY,
                actual:   mem_objects.len(),
            });
        }

        let spirv = K::IMAGE.to_words();
        algorithm.rebuild(mem_objects, &spirv)?;

        Ok(Self { algorithm, _kernel: PhantomData })
    }

    /// The dispatch target this operation was bound to
    pub fn algorithm(&self) -> &Arc<dyn DispatchTarget> {
        &self.algorithm
    }
}

impl<K: FixedArityKernel> RecordDispatch for FixedArityOperation<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn record(&self, recorder: &mut dyn CommandRecorder) -> Result<(), DeviceBindError> {
        recorder.record_dispatch(self.algorithm.as_ref())
    }
}

impl<K: FixedArityKernel> Drop for FixedArityOperation<K> {
    fn drop(&mut self) {
        debug!("{} destructor started", K::NAME);
    }
}


/// Wrapper for op factory functions
pub struct OpFactory {
    pub name:  &'static str,
    pub arity: usize,
    pub build: fn(&[MemoryHandle], Arc<dyn DispatchTarget>) -> Result<Box<dyn RecordDispatch>, OpError>,
}

/// Type-erased constructor used by [`register_op!`](crate::register_op).
pub fn build_boxed<K: FixedArityKernel>(
    mem_objects: &[MemoryHandle],
    algorithm:   Arc<dyn DispatchTarget>,
) -> Result<Box<dyn RecordDispatch>, OpError> {
    Ok(Box::new(FixedArityOperation::<K>::new(mem_objects, algorithm)?))
}

// Collect all registered ops
inventory::collect!(OpFactory);
