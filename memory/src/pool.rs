use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use parking_lot::Mutex;

use vkop_core::GpuContext;
use vkop_core::types::{AbstractBuffer, BufferKind};

/// Identifier of a buffer inside a [`BufferPool`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);
impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

struct BufferEntry {
    buffer: Arc<AbstractBuffer>,
    size: usize,
}

/// thread-safe pool of GPU buffers
pub struct BufferPool {
    ctx: GpuContext,
    usage: BufferKind,
    next_id: AtomicU64,
    entries: Mutex<HashMap<BufferId, BufferEntry>>,
}

impl BufferPool {
    pub fn new(ctx: GpuContext, usage: BufferKind) -> Self {
        Self {
            ctx,
            usage,
            next_id: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a buffer of `size_bytes`, returning a unique ID and a shared handle to it
    pub fn create_buffer(&self, size_bytes: usize) -> (BufferId, Arc<AbstractBuffer>) {
        let raw = self.ctx.create_buffer(size_bytes as u64, self.usage);
        let id = BufferId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(raw);

        self.entries.lock().insert(id, BufferEntry {
            buffer: handle.clone(),
            size: size_bytes,
        });
        (id, handle)
    }

    /// Retrieve a clonable handle to the buffer for a given ID
    pub fn get(&self, id: BufferId) -> Option<Arc<AbstractBuffer>> {
        self.entries.lock().get(&id).map(|e| e.buffer.clone())
    }

    pub fn get_buffer_size(&self, id: BufferId) -> Option<usize> {
        self.entries.lock().get(&id).map(|e| e.size)
    }

    /// Forget a buffer. Holders of its handle keep it alive.
    pub fn release_buffer(&self, id: BufferId) {
        self.entries.lock().remove(&id);
    }

    /// Clear entries with only one reference (the one in the pool)
    pub fn clear_unused(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| Arc::strong_count(&entry.buffer) > 1);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn usage(&self) -> BufferKind { self.usage }
}
