use std::{
    alloc::{GlobalAlloc, Layout},
    ptr::NonNull,
};

/// An allocator the harness can drive.
///
/// `allocate` returns `None` when no memory could be handed out. Handles are
/// owned by the harness until passed back to `release`.
pub trait Allocator {
    type Handle;

    fn allocate(&mut self, size: usize) -> Option<Self::Handle>;

    fn release(&mut self, handle: Self::Handle);

    /// Called once before the first request with the worst-case number of
    /// bytes the run may ask for.
    fn prepare(&mut self, _arena_bytes: usize) {}

    /// Called once after the last block was released, also when the run
    /// aborted.
    fn teardown(&mut self) {}
}

/// A block handed out by a [`GlobalAllocator`].
#[derive(Debug)]
pub struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }
}

/// Drives any [`GlobalAlloc`] through the [`Allocator`] interface using
/// byte-aligned layouts.
#[derive(Debug, Default)]
pub struct GlobalAllocator<A>(A);

impl<A: GlobalAlloc> GlobalAllocator<A> {
    pub const fn new(allocator: A) -> Self {
        GlobalAllocator(allocator)
    }

    pub fn inner(&self) -> &A {
        &self.0
    }
}

impl<A: GlobalAlloc> Allocator for GlobalAllocator<A> {
    type Handle = Block;

    fn allocate(&mut self, size: usize) -> Option<Block> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, 1).ok()?;
        // SAFETY: layout has a nonzero size
        let ptr = unsafe { self.0.alloc(layout) };
        NonNull::new(ptr).map(|ptr| Block { ptr, layout })
    }

    fn release(&mut self, block: Block) {
        // SAFETY: blocks are only created by `allocate` above with this layout,
        // and consuming the handle rules out a double free
        unsafe { self.0.dealloc(block.ptr.as_ptr(), block.layout) }
    }
}

/// A [`GlobalAlloc`] that reports every call to a set of hooks.
///
/// Zeroed allocations and reallocations go through the default `GlobalAlloc`
/// methods, which are built on `alloc` and `dealloc`.
#[derive(Debug, Default)]
pub struct TracingAllocator<H, A>(A, H)
where
    A: GlobalAlloc;

impl<H, A> TracingAllocator<H, A>
where
    A: GlobalAlloc,
{
    pub const fn new(hooks: H, allocator: A) -> Self {
        TracingAllocator(allocator, hooks)
    }

    pub fn hooks(&self) -> &H {
        &self.1
    }
}

unsafe impl<H, A> GlobalAlloc for TracingAllocator<H, A>
where
    A: GlobalAlloc,
    H: AllocHooks,
{
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        let align = layout.align();
        let pointer = self.0.alloc(layout);
        self.1.on_alloc(pointer, size, align);
        pointer
    }

    unsafe fn dealloc(&self, pointer: *mut u8, layout: Layout) {
        let size = layout.size();
        let align = layout.align();
        self.0.dealloc(pointer, layout);
        self.1.on_dealloc(pointer, size, align);
    }
}

/// # Safety
///
/// Hooks run inside the allocator and must not allocate themselves.
pub unsafe trait AllocHooks {
    fn on_alloc(&self, pointer: *mut u8, size: usize, align: usize);
    fn on_dealloc(&self, pointer: *mut u8, size: usize, align: usize);
}
