// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Allocation tracking used to attribute peak memory to a single query.
//!
//! Every allocation of the process goes through [`TrackingAllocator`], which
//! keeps the number of live bytes and a high-water mark. A [`MemoryWindow`]
//! resets the high-water mark to the current live bytes when it is opened, so
//! the peak it reports only covers allocations made while it was open.

use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: TrackingAllocator<mimalloc::MiMalloc> =
    TrackingAllocator::new(mimalloc::MiMalloc);

#[cfg(not(feature = "mimalloc"))]
#[global_allocator]
static ALLOC: TrackingAllocator<std::alloc::System> =
    TrackingAllocator::new(std::alloc::System);

/// Global allocator wrapper counting live and peak bytes
pub struct TrackingAllocator<A> {
    inner: A,
}

impl<A> TrackingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

fn record_alloc(size: usize) {
    let current = ALLOCATED.fetch_add(size, Ordering::SeqCst) + size;
    PEAK_ALLOCATED.fetch_max(current, Ordering::SeqCst);
}

fn record_dealloc(size: usize) {
    ALLOCATED.fetch_sub(size, Ordering::SeqCst);
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: delegating to the wrapped allocator with the caller's layout
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: delegating to the wrapped allocator with the caller's layout
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: ptr was returned by the wrapped allocator for this layout
        unsafe { self.inner.dealloc(ptr, layout) };
        record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: ptr was returned by the wrapped allocator for this layout
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            let old_size = layout.size();
            if new_size > old_size {
                record_alloc(new_size - old_size);
            } else {
                record_dealloc(old_size - new_size);
            }
        }
        new_ptr
    }
}

/// Bytes currently allocated by the process
pub fn allocated_bytes() -> usize {
    ALLOCATED.load(Ordering::SeqCst)
}

/// Scope over which the allocation peak is tracked
#[derive(Debug)]
pub struct MemoryWindow {
    baseline: usize,
}

impl MemoryWindow {
    /// Start tracking from the current number of live bytes
    pub fn open() -> Self {
        let baseline = ALLOCATED.load(Ordering::SeqCst);
        PEAK_ALLOCATED.store(baseline, Ordering::SeqCst);
        Self { baseline }
    }

    /// Highest number of bytes allocated above the baseline while open
    pub fn close(self) -> usize {
        PEAK_ALLOCATED
            .load(Ordering::SeqCst)
            .saturating_sub(self.baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hint::black_box;

    const MB: usize = 1024 * 1024;

    #[test]
    fn window_sees_allocations_made_while_open() {
        let window = MemoryWindow::open();
        let buffer = black_box(vec![1u8; 16 * MB]);
        let peak = window.close();
        drop(buffer);

        assert!(peak >= 8 * MB, "peak was {peak} bytes");
    }

    #[test]
    fn window_ignores_peaks_before_it_was_opened() {
        let large = black_box(vec![1u8; 256 * MB]);
        drop(large);

        let window = MemoryWindow::open();
        let small = black_box(vec![1u8; MB]);
        let peak = window.close();
        drop(small);

        assert!(peak < 128 * MB, "peak was {peak} bytes");
    }

    #[test]
    fn realloc_growth_is_tracked() {
        let window = MemoryWindow::open();
        let mut buffer: Vec<u8> = Vec::with_capacity(MB);
        buffer.reserve_exact(32 * MB);
        black_box(&buffer);
        let peak = window.close();
        drop(buffer);

        assert!(peak >= 16 * MB, "peak was {peak} bytes");
    }
}
