use std::{
    collections::HashMap,
    sync::Arc,
};
use log::trace;
use parking_lot::Mutex;

use vkop_core::{
    GpuContext, DeviceBindError, KERNEL_ENTRY_POINT,
    types::AbstractBindGroupLayout, types::AbstractComputePipeline,
};

/// Signature of a compiled kernel: SPIR-V words + number of bindings
#[derive(Clone, PartialEq, Eq, Hash)]
struct KernelKey {
    spirv:    Arc<[u32]>,
    bindings: usize,
}

struct PipelineBundle {
    pipeline: Arc<AbstractComputePipeline>,
    layout:   Arc<AbstractBindGroupLayout>,
}

/// Structure for managing kernel pipelines and layouts.
pub struct KernelManager {
    ctx:   GpuContext,
    cache: Mutex<HashMap<KernelKey, Arc<PipelineBundle>>>,
}

impl KernelManager {
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx, cache: Mutex::new(HashMap::new()) }
    }

    pub fn get(
        &self,
        spirv:    &[u32],
        bindings: usize,
    ) -> Result<(Arc<AbstractComputePipeline>, Arc<AbstractBindGroupLayout>), DeviceBindError> {
        let key = KernelKey {
            spirv: Arc::from(spirv),
            bindings,
        };

        // cache lookup
        if let Some(b) = self.cache.lock().get(&key) {
            trace!("kernel cache hit ({} words, {} bindings)", spirv.len(), bindings);
            return Ok((b.pipeline.clone(), b.layout.clone()));
        }

        // create layout + pipeline via GpuContext; rejected kernels are not cached
        let (pipeline, layout) = self.ctx.capture_validation("compute pipeline", |ctx| {
            let layout = ctx.create_storage_layout(bindings);
            let pipeline = ctx.create_spirv_pipeline(spirv, KERNEL_ENTRY_POINT, &layout);
            (pipeline, layout)
        })?;

        let bundle = Arc::new(PipelineBundle { pipeline: pipeline.clone(), layout: layout.clone() });
        self.cache.lock().insert(key, bundle);

        Ok((pipeline, layout))
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
