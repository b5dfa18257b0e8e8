//! Allocation of the buffer under test.
//!
//! The buffer is an anonymous mapping, populated up front and locked into RAM with
//! `mlock` so the tests exercise physical memory rather than swap.

use libc::{MAP_ANONYMOUS, MAP_POPULATE, MAP_SHARED};
use log::{debug, info};
use memprobe_core::memory::Word;
use memprobe_core::util::PAGE_SIZE;
use std::ptr::null_mut;
use thiserror::Error;

/// Errors that can occur while allocating the buffer.
#[derive(Debug, Error)]
pub enum AllocError {
    /// Attempted to allocate zero bytes
    #[error("Zero size allocation")]
    ZeroSize,
    /// The mapping could not be created
    #[error("mmap of {size} bytes failed: {source}")]
    MmapFailed {
        /// Requested size in bytes
        size: usize,
        /// The OS error
        source: std::io::Error,
    },
}

/// An anonymous memory mapping holding the words under test.
///
/// Unlocked and unmapped on drop.
#[derive(Debug)]
pub struct Memory {
    ptr: *mut u8,
    len: usize,
    locked: bool,
}

impl Memory {
    /// Maps `size` bytes, rounded up to whole pages.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or mmap fails.
    pub fn mmap(size: usize) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let len = size.div_ceil(PAGE_SIZE) * PAGE_SIZE;
        let p = unsafe {
            libc::mmap(
                null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_SHARED | MAP_ANONYMOUS | MAP_POPULATE,
                -1,
                0,
            )
        };
        if p == libc::MAP_FAILED {
            return Err(AllocError::MmapFailed {
                size: len,
                source: std::io::Error::last_os_error(),
            });
        }
        debug!("mapped {} bytes at {:p}", len, p);
        Ok(Memory {
            ptr: p as *mut u8,
            len,
            locked: false,
        })
    }

    /// Locks the mapping into RAM.
    ///
    /// # Errors
    ///
    /// Returns the OS error if `mlock` fails, usually for lack of `CAP_IPC_LOCK` or
    /// a too small `RLIMIT_MEMLOCK`.
    pub fn lock(&mut self) -> std::io::Result<()> {
        if self.locked {
            return Ok(());
        }
        if unsafe { libc::mlock(self.ptr as *const libc::c_void, self.len) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        info!("locked {} bytes", self.len);
        self.locked = true;
        Ok(())
    }

    /// Returns true if the mapping is locked into RAM.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns a pointer to the start of the mapping.
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Returns the length of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the mapping is empty. Never the case for a successful mmap.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the mapping as words.
    pub fn words_mut(&mut self) -> &mut [Word] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr as *mut Word,
                self.len / std::mem::size_of::<Word>(),
            )
        }
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        unsafe {
            if self.locked {
                libc::munlock(self.ptr as *const libc::c_void, self.len);
            }
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memprobe_core::util::WORD_SIZE;

    #[test]
    fn test_mmap_rounds_to_pages() -> anyhow::Result<()> {
        let mut memory = Memory::mmap(100)?;
        assert_eq!(memory.len(), PAGE_SIZE);
        assert_eq!(memory.words_mut().len(), PAGE_SIZE / WORD_SIZE);
        Ok(())
    }

    #[test]
    fn test_mmap_words_are_writable() -> anyhow::Result<()> {
        let mut memory = Memory::mmap(2 * PAGE_SIZE)?;
        let words = memory.words_mut();
        assert!(words.iter().all(|&w| w == 0));
        words.iter_mut().enumerate().for_each(|(i, w)| *w = i);
        assert_eq!(memory.words_mut()[17], 17);
        Ok(())
    }

    #[test]
    fn test_mmap_zero_size() {
        assert!(matches!(Memory::mmap(0), Err(AllocError::ZeroSize)));
    }
}
