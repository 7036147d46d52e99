//! Recycled working buffers.
//!
//! Pipelines rent their row buffers at construction and hand them back when
//! dropped. Storage is kept as `u32` words so a buffer can be viewed as any
//! sample or accumulator type with alignment of four or less.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::marker::PhantomData;
use std::sync::{Mutex, OnceLock};

use crate::ResizeError;

/// Free list of word buffers shared by any number of pipelines.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u32>>>,
    max_retained: usize,
}

impl BufferPool {
    /// A pool that keeps at most `max_retained` idle buffers.
    pub fn new(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// The process-wide pool used when no pool is given explicitly.
    pub fn shared() -> Arc<BufferPool> {
        static SHARED: OnceLock<Arc<BufferPool>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(BufferPool::new(16))).clone()
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Rents a zeroed buffer of `len` elements of `T`.
    pub fn rent<T: bytemuck::Pod>(
        self: &Arc<Self>,
        len: usize,
    ) -> Result<PooledBuffer<T>, ResizeError> {
        debug_assert!(core::mem::align_of::<T>() <= 4);
        let bytes = len
            .checked_mul(core::mem::size_of::<T>())
            .ok_or(ResizeError::OutOfMemory)?;
        let words_len = bytes.div_ceil(4);

        let recycled = {
            let mut free = self.lock();
            // smallest idle buffer that is large enough
            let best = free
                .iter()
                .enumerate()
                .filter(|(_, b)| b.capacity() >= words_len)
                .min_by_key(|(_, b)| b.capacity())
                .map(|(i, _)| i);
            best.map(|i| free.swap_remove(i))
        };

        let mut words = match recycled {
            Some(w) => w,
            None => {
                let mut w = Vec::new();
                w.try_reserve_exact(words_len)
                    .map_err(|_| ResizeError::OutOfMemory)?;
                w
            }
        };
        words.clear();
        words.resize(words_len, 0);

        Ok(PooledBuffer {
            words,
            len,
            pool: Arc::clone(self),
            _marker: PhantomData,
        })
    }

    fn give_back(&self, words: Vec<u32>) {
        if words.capacity() == 0 {
            return;
        }
        let mut free = self.lock();
        if free.len() < self.max_retained {
            free.push(words);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u32>>> {
        // a poisoned free list holds plain vectors and is still usable
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(16)
    }
}

/// A buffer rented from a [`BufferPool`], returned to it on drop.
pub struct PooledBuffer<T> {
    words: Vec<u32>,
    len: usize,
    pool: Arc<BufferPool>,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> PooledBuffer<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &bytemuck::cast_slice::<u32, T>(&self.words)[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut bytemuck::cast_slice_mut::<u32, T>(&mut self.words)[..self.len]
    }
}

impl<T> Drop for PooledBuffer<T> {
    fn drop(&mut self) {
        self.pool.give_back(core::mem::take(&mut self.words));
    }
}

impl<T> core::fmt::Debug for PooledBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len)
            .field("words", &self.words.len())
            .finish()
    }
}
