use core::{mem, ptr};
use alloc::alloc::Layout;

pub use mem::{MaybeUninit, transmute};

//libopus state is only required to be aligned as malloc would align it
#[cfg(not(any(target_os = "macos", all(windows, target_pointer_width = "64"))))]
const MIN_ALIGN: usize = 8;
#[cfg(any(target_os = "macos", all(windows, target_pointer_width = "64")))]
const MIN_ALIGN: usize = 16;

//Allocation size is stored right before the state so that Drop can rebuild layout
const HEADER_SIZE: usize = mem::size_of::<usize>();

#[inline(always)]
fn layout_for(total_size: usize) -> Option<Layout> {
    Layout::from_size_align(total_size, MIN_ALIGN).ok()
}

#[repr(transparent)]
///Owning pointer to opaque libopus state of runtime defined size
///
///Can never be null
pub struct Unique<T>(ptr::NonNull<T>);

impl<T> Unique<T> {
    #[cold]
    #[inline(never)]
    fn alloc_failed() -> Option<Self> {
        None
    }

    ///Allocates `size` bytes of uninitialized storage for `T`
    pub fn new(size: usize) -> Option<Self> {
        let total_size = match size.checked_add(HEADER_SIZE) {
            Some(total_size) => total_size,
            None => return Self::alloc_failed(),
        };
        let layout = match layout_for(total_size) {
            Some(layout) => layout,
            None => return Self::alloc_failed(),
        };

        unsafe {
            match ptr::NonNull::new(alloc::alloc::alloc(layout)) {
                Some(header) => {
                    ptr::write(header.as_ptr() as *mut usize, total_size);
                    Some(Self(header.add(HEADER_SIZE).cast()))
                },
                None => Self::alloc_failed(),
            }
        }
    }

    #[inline(always)]
    pub fn as_mut(&mut self) -> *mut T {
        self.0.as_ptr()
    }
}

impl<T> Drop for Unique<T> {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            let header = (self.0.as_ptr() as *mut u8).sub(HEADER_SIZE);
            let total_size = ptr::read(header as *const usize);
            let layout = Layout::from_size_align_unchecked(total_size, MIN_ALIGN);
            alloc::alloc::dealloc(header, layout);
        }
    }
}
