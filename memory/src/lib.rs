mod pool;

use anyhow::{ensure, Context, Result};
use bytemuck::{allocation::pod_collect_to_vec, cast_slice, Pod};
use log::trace;
use vkop_core::{GpuContext, types::BufferKind, types::MemoryHandle};

pub use pool::{BufferId, BufferPool};

/// Manages three buffer pools on **one** GPU device:
/// - `main_pool`         : STORAGE buffers that hold tensor data
/// - `staging_upload`    : MAP_WRITE + COPY_SRC  (CPU → GPU)
/// - `staging_download`  : MAP_READ  + COPY_DST  (GPU → CPU)
///
/// Memory objects handed out by [`MemoryManager::get_ref`] are shared: a
/// buffer stays alive while any operation or algorithm still holds it, even
/// after it was released here.
pub struct MemoryManager {
    ctx:              GpuContext,
    main_pool:        BufferPool,
    staging_upload:   BufferPool,
    staging_download: BufferPool,
}

impl MemoryManager {
    pub fn new(ctx: GpuContext) -> Self {
        let main_pool        = BufferPool::new(ctx.clone(), BufferKind::Main);
        let staging_upload   = BufferPool::new(ctx.clone(), BufferKind::Upload);
        let staging_download = BufferPool::new(ctx.clone(), BufferKind::Download);

        Self { ctx, main_pool, staging_upload, staging_download }
    }

    /// Raw allocation; `size_bytes` must be a non-zero multiple of 4.
    pub fn allocate_raw(&self, size_bytes: usize) -> Result<BufferId> {
        ensure!(size_bytes > 0, "cannot allocate an empty buffer");
        ensure!(size_bytes % 4 == 0, "buffer size {size_bytes} is not a multiple of 4 bytes");
        let (id, _) = self.main_pool.create_buffer(size_bytes);
        trace!("allocated {} ({} bytes)", id, size_bytes);
        Ok(id)
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn upload<T: Pod>(&self, data: &[T]) -> Result<BufferId> {
        let id = self.allocate_raw(std::mem::size_of_val(data))?;
        self.write_to_buffer(id, data)?;
        Ok(id)
    }

    /// Raw deallocation
    pub fn release(&self, id: BufferId) {
        self.main_pool.release_buffer(id);
    }

    /// Drop every buffer that nothing outside the pool references.
    pub fn clear_unused(&self) -> usize {
        self.main_pool.clear_unused()
    }

    /// Raw upload: CPU → GPU.
    pub fn write_to_buffer<T: Pod>(&self, dest_id: BufferId, data: &[T]) -> Result<()> {
        let bytes: &[u8] = cast_slice(data);
        ensure!(!bytes.is_empty(), "nothing to write to {dest_id}");
        let dst = self.main_pool.get(dest_id)
            .with_context(|| format!("unknown buffer {dest_id}"))?;
        ensure!(bytes.len() as u64 <= dst.size(),
                "{} bytes do not fit in {} ({} bytes)", bytes.len(), dest_id, dst.size());
        ensure!(bytes.len() % 4 == 0, "upload of {} bytes is not a multiple of 4 bytes", bytes.len());

        // 1) staging_upload: write via GpuContext
        let (sid, src) = self.staging_upload.create_buffer(bytes.len());
        let res = self.ctx.write_buffer(&src, bytes).map(|()| {
            // 2) copy staging_upload → main_pool[dest_id]
            self.ctx.copy_buffer_to_buffer(&src, &dst, bytes.len() as u64);
        });

        // 3) cleanup staging
        self.staging_upload.release_buffer(sid);
        res
    }

    /// Raw download: GPU → CPU into a `Vec<T>`
    pub fn download_raw<T: Pod>(&self, id: BufferId) -> Result<Vec<T>> {
        // 1) Copy main → staging_download
        let src = self.main_pool.get(id)
            .with_context(|| format!("unknown buffer {id}"))?;
        let size = src.size();
        let (sid, dst) = self.staging_download.create_buffer(size as usize);
        self.ctx.copy_buffer_to_buffer(&src, &dst, size);

        // 2) read entire staging buffer via GpuContext
        let bytes = self.ctx.read_buffer(&dst);

        // 3) cleanup staging
        self.staging_download.release_buffer(sid);

        // 4) cast to Vec<T>
        Ok(pod_collect_to_vec(&bytes?))
    }

    /// Shared handle to a buffer in the main pool, usable as a memory object.
    pub fn get_ref(&self, id: BufferId) -> Option<MemoryHandle> {
        self.main_pool.get(id).map(|b| b as MemoryHandle)
    }

    pub fn ctx(&self) -> &GpuContext {
        &self.ctx
    }
}
