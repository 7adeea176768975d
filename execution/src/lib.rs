mod algorithm;
mod kernel_manager;

use log::debug;

use vkop_core::GpuContext;
use vkop_core::DeviceBindError;
use vkop_core::types::{CommandRecorder, DispatchTarget};
use vkop_core::wgpu::CommandEncoder;
use vkop_ops::RecordDispatch;

pub use algorithm::{Algorithm, DEFAULT_WORKGROUP_SIZE};
pub use kernel_manager::KernelManager;


/// Command-recording context: operations append their dispatches to one
/// encoder, which [`Sequence::eval`] submits as a single batch.
pub struct Sequence {
    ctx:      GpuContext,
    encoder:  Option<CommandEncoder>,
    recorded: usize,
}

impl Sequence {
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx, encoder: None, recorded: 0 }
    }

    /// Record the dispatch of `op`. Chainable.
    pub fn record(&mut self, op: &dyn RecordDispatch) -> Result<&mut Self, DeviceBindError> {
        debug!("recording {}", op.name());
        op.record(&mut *self)?;
        Ok(self)
    }

    /// Dispatches recorded since the last evaluation
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Submit everything recorded so far and block until the device is idle.
    pub fn eval(&mut self) -> anyhow::Result<()> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        debug!("submitting {} dispatches", self.recorded);
        self.ctx.submit_encoder(encoder);
        self.recorded = 0;
        self.ctx.wait_idle()
    }
}

impl CommandRecorder for Sequence {
    fn record_dispatch(&mut self, target: &dyn DispatchTarget) -> Result<(), DeviceBindError> {
        let ctx = &self.ctx;
        let encoder = self.encoder.get_or_insert_with(|| ctx.create_encoder("sequence"));
        target.encode(encoder)?;
        self.recorded += 1;
        Ok(())
    }
}


/* ------------------------------------------------------------------------- */
/*                                  Tests                                    */
/* ------------------------------------------------------------------------- */
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use memory::MemoryManager;
    use pollster::block_on;
    use vkop_core::types::MemoryHandle;
    use vkop_ops::{OpError, OpMult, OpRegistry};

    fn context() -> GpuContext {
        let _ = env_logger::builder().is_test(true).try_init();
        block_on(GpuContext::new()).expect("Failed to create GPU context")
    }

    #[test]
    #[cfg_attr(not(feature = "gpu-tests"), ignore = "needs a GPU adapter")]
    fn run_mult_op() {
        let ctx = context();
        let mm = MemoryManager::new(ctx.clone());

        // --- memory objects ---------------------------------------------
        let a = mm.upload(&[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let b = mm.upload(&[5.0f32, 6.0, 7.0, 8.0]).unwrap();
        let c = mm.allocate_raw(4 * std::mem::size_of::<f32>()).unwrap();
        let mem: Vec<MemoryHandle> = [a, b, c].iter()
            .map(|&id| mm.get_ref(id).unwrap())
            .collect();

        // --- op + run ---------------------------------------------------
        let algo = Arc::new(Algorithm::new(ctx.clone()));
        let op = OpMult::new(&mem, algo.clone()).unwrap();

        let mut seq = Sequence::new(ctx.clone());
        seq.record(&op).unwrap();
        assert_eq!(seq.recorded(), 1);
        seq.eval().unwrap();
        assert_eq!(seq.recorded(), 0);

        // --- check results ----------------------------------------------
        let result: Vec<f32> = mm.download_raw(c).unwrap();
        assert_eq!(result, vec![5.0, 12.0, 21.0, 32.0]);
    }

    #[test]
    #[cfg_attr(not(feature = "gpu-tests"), ignore = "needs a GPU adapter")]
    fn target_outlives_op_and_takes_new_bindings() {
        let ctx = context();
        let mm = MemoryManager::new(ctx.clone());
        let algo = Arc::new(Algorithm::new(ctx.clone()));

        let a = mm.upload(&[2.0f32; 70]).unwrap();
        let b = mm.upload(&[3.0f32; 70]).unwrap();
        let c = mm.allocate_raw(70 * 4).unwrap();
        let d = mm.allocate_raw(70 * 4).unwrap();
        let handle = |id| mm.get_ref(id).unwrap();

        let op = OpMult::new(&[handle(a), handle(b), handle(c)], algo.clone()).unwrap();
        Sequence::new(ctx.clone()).record(&op).unwrap().eval().unwrap();
        drop(op);

        // inputs survive the op, and the same algorithm accepts a new op
        let op = OpMult::new(&[handle(c), handle(a), handle(d)], algo.clone()).unwrap();
        Sequence::new(ctx.clone()).record(&op).unwrap().eval().unwrap();

        assert_eq!(mm.download_raw::<f32>(a).unwrap(), vec![2.0; 70]);
        assert_eq!(mm.download_raw::<f32>(c).unwrap(), vec![6.0; 70]);
        assert_eq!(mm.download_raw::<f32>(d).unwrap(), vec![12.0; 70]);
    }

    #[test]
    #[cfg_attr(not(feature = "gpu-tests"), ignore = "needs a GPU adapter")]
    fn registry_builds_against_device() {
        let ctx = context();
        let mm = MemoryManager::new(ctx.clone());
        let algo = Arc::new(Algorithm::new(ctx.clone()));

        let mut reg = OpRegistry::new();
        reg.collect_inventory();

        let ids = [
            mm.upload(&[1.5f32, -2.0]).unwrap(),
            mm.upload(&[2.0f32, 4.0]).unwrap(),
            mm.allocate_raw(8).unwrap(),
        ];
        let mem: Vec<MemoryHandle> = ids.iter().map(|&id| mm.get_ref(id).unwrap()).collect();

        match reg.build("mult", &mem[..2], algo.clone()) {
            Err(OpError::InvalidArity { expected: 3, actual: 2, .. }) => {}
            Err(other) => panic!("expected InvalidArity, got {other}"),
            Ok(_) => panic!("two mem objects should be rejected"),
        }
        assert!(!algo.is_built());

        let op = reg.build("mult", &mem, algo.clone()).unwrap();
        let mut seq = Sequence::new(ctx.clone());
        seq.record(op.as_ref()).unwrap();
        seq.eval().unwrap();

        assert_eq!(mm.download_raw::<f32>(ids[2]).unwrap(), vec![3.0, -8.0]);
    }

    #[test]
    #[cfg_attr(not(feature = "gpu-tests"), ignore = "needs a GPU adapter")]
    fn staging_buffer_is_rejected_by_the_device_layer() {
        let ctx = context();
        let algo = Arc::new(Algorithm::new(ctx.clone()));
        let mem: Vec<MemoryHandle> = vec![
            Arc::new(ctx.create_buffer(16, vkop_core::types::BufferKind::Main)) as MemoryHandle,
            Arc::new(ctx.create_buffer(16, vkop_core::types::BufferKind::Main)) as MemoryHandle,
            Arc::new(ctx.create_buffer(16, vkop_core::types::BufferKind::Upload)) as MemoryHandle,
        ];

        match OpMult::new(&mem, algo.clone()) {
            Err(OpError::Rebuild(DeviceBindError::IncompatibleMemory { index: 2, .. })) => {}
            Err(other) => panic!("expected IncompatibleMemory, got {other}"),
            Ok(_) => panic!("upload staging buffer should not bind as storage"),
        }
        assert!(!algo.is_built());
    }

    #[test]
    #[cfg_attr(not(feature = "gpu-tests"), ignore = "needs a GPU adapter")]
    fn eval_without_records_is_a_noop() {
        let ctx = context();
        let mut seq = Sequence::new(ctx);
        seq.eval().unwrap();
        assert_eq!(seq.recorded(), 0);
    }
}
