pub mod op;
pub mod kernel;
pub mod types;
pub mod builtin;

#[cfg(test)]
mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use vkop_core::types::{DispatchTarget, MemoryHandle};

pub use builtin::mult::{MultKernel, OpMult};
pub use kernel::{KernelImage, INSTRUCTION_WORD_SIZE};
pub use op::{build_boxed, FixedArityKernel, FixedArityOperation, OpFactory, RecordDispatch};
pub use types::{OpError, RegistrationInfo};


/// Register a fixed-arity kernel with the inventory system
#[macro_export]
macro_rules! register_op {
    ($kernel:ty) => {
        inventory::submit! {
            $crate::OpFactory {
                name:  <$kernel as $crate::RegistrationInfo>::NAME,
                arity: <$kernel as $crate::FixedArityKernel>::ARITY,
                build: $crate::build_boxed::<$kernel>,
            }
        }
    };
}


/// Holds all registered ops and builds them by name
pub struct OpRegistry {
    map: HashMap<&'static str, &'static OpFactory>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn collect_inventory(&mut self) {
        for factory in inventory::iter::<OpFactory> {
            self.register(factory);
        }
    }

    /// Register a factory under its own name
    pub fn register(&mut self, factory: &'static OpFactory) {
        self.map.insert(factory.name, factory);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.map.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.map.get(name).map(|f| f.arity)
    }

    /// Lookup + construct in one call
    pub fn build(
        &self,
        name:        &str,
        mem_objects: &[MemoryHandle],
        algorithm:   Arc<dyn DispatchTarget>,
    ) -> Result<Box<dyn RecordDispatch>, OpError> {
        let factory = self.map.get(name)
            .ok_or_else(|| OpError::UnknownOp(name.to_string()))?;
        (factory.build)(mem_objects, algorithm)
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::new()
    }
}
