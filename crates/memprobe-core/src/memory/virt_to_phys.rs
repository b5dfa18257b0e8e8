use std::fmt;
use std::ops::Add;

use crate::util::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
use log::{debug, warn};
use pagemap2::{PageMapError, VirtualMemoryArea};
use serde::Serialize;
use thiserror::Error;

/// Physical address of a tested word, as reported in failure lines.
#[repr(transparent)]
#[derive(Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Creates a new physical address.
    pub fn new(addr: usize) -> Self {
        PhysAddr(addr)
    }

    /// Returns the address as a usize.
    pub fn as_usize(&self) -> usize {
        self.0
    }

    fn from_pfn(pfn: u64, page_offset: usize) -> Self {
        PhysAddr(((pfn as usize) << PAGE_SHIFT) | page_offset)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr(0x{:08x})", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<PhysAddr> for usize {
    fn from(addr: PhysAddr) -> usize {
        addr.0
    }
}

impl Add<usize> for PhysAddr {
    type Output = PhysAddr;

    /// Wraps around at the end of the address space.
    fn add(self, rhs: usize) -> Self::Output {
        PhysAddr(self.0.wrapping_add(rhs))
    }
}

/// Trait for finding the physical location of a buffer under test.
///
/// Physical failure reports are computed as `base + offset`, which is only exact
/// while the buffer is physically contiguous. [`contiguous_len`](Self::contiguous_len)
/// tells callers how far that holds.
pub trait VirtToPhysResolver {
    /// Errors that can occur during resolution
    type Error;

    /// Translates a virtual address to a physical address.
    ///
    /// # Errors
    ///
    /// Returns an error if the translation is not available.
    fn get_phys(&mut self, virt: usize) -> Result<PhysAddr, Self::Error>;

    /// Returns how many bytes starting at `virt` are backed by physically
    /// contiguous memory, at most `len`.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the pages cannot be translated.
    fn contiguous_len(&mut self, virt: usize, len: usize) -> Result<usize, Self::Error> {
        let base = self.get_phys(virt)?;
        let mut page = (virt & !PAGE_MASK) + PAGE_SIZE;
        while page < virt + len {
            if self.get_phys(page)? != base + (page - virt) {
                return Ok(page - virt);
            }
            page += PAGE_SIZE;
        }
        Ok(len)
    }
}

/// Errors raised while reading the pagemap
#[derive(Debug, Error)]
pub enum LinuxPageMapError {
    /// The pagemap interface reported an error
    #[error(transparent)]
    PageMap(#[from] PageMapError),
    /// The pagemap returned a different number of entries than pages were requested
    #[error("got {got} pagemap entries for 0x{virt:x}, expected {expected}")]
    UnexpectedEntries {
        /// Number of entries returned
        got: usize,
        /// Number of pages requested
        expected: usize,
        /// Start of the requested range
        virt: usize,
    },
}

/// Resolves physical addresses through `/proc/{pid}/pagemap`.
///
/// Without `CAP_SYS_ADMIN` the kernel reports every frame number as 0.
pub struct LinuxPageMap {
    pagemap: pagemap2::PageMap,
}

impl LinuxPageMap {
    /// Opens the pagemap of the current process.
    ///
    /// # Errors
    ///
    /// Returns an error if opening `/proc/self/pagemap` fails.
    pub fn new() -> Result<LinuxPageMap, LinuxPageMapError> {
        Self::for_process(std::process::id())
    }

    /// Opens the pagemap of process `pid`.
    ///
    /// # Errors
    ///
    /// Returns an error if opening the process pagemap fails.
    pub fn for_process(pid: u32) -> Result<LinuxPageMap, LinuxPageMapError> {
        Ok(LinuxPageMap {
            pagemap: pagemap2::PageMap::new(pid as u64)?,
        })
    }

    /// Frame numbers of all pages touched by `virt..virt + len`.
    fn frames(&mut self, virt: usize, len: usize) -> Result<Vec<u64>, LinuxPageMapError> {
        let first = virt & !PAGE_MASK;
        let pages = (virt + len.max(1) - first).div_ceil(PAGE_SIZE);
        let vma = VirtualMemoryArea::from((first as u64, (first + pages * PAGE_SIZE - 1) as u64));
        let entries = self.pagemap.pagemap_vma(&vma)?;
        if entries.len() != pages {
            return Err(LinuxPageMapError::UnexpectedEntries {
                got: entries.len(),
                expected: pages,
                virt,
            });
        }
        let frames = entries
            .iter()
            .map(|entry| entry.pfn())
            .collect::<Result<Vec<_>, _>>()?;
        if frames.first() == Some(&0) {
            warn!("Got frame number 0 for 0x{:x}, missing CAP_SYS_ADMIN?", virt);
        }
        Ok(frames)
    }
}

impl VirtToPhysResolver for LinuxPageMap {
    type Error = LinuxPageMapError;

    fn get_phys(&mut self, virt: usize) -> Result<PhysAddr, Self::Error> {
        let frames = self.frames(virt, 1)?;
        let phys = PhysAddr::from_pfn(frames[0], virt & PAGE_MASK);
        debug!("virtual 0x{:x} -> {:?}", virt, phys);
        Ok(phys)
    }

    fn contiguous_len(&mut self, virt: usize, len: usize) -> Result<usize, Self::Error> {
        let frames = self.frames(virt, len)?;
        let run = frames
            .windows(2)
            .take_while(|w| w[1] == w[0] + 1)
            .count();
        let end = (virt & !PAGE_MASK) + (run + 1) * PAGE_SIZE;
        Ok((end - virt).min(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_phys_addr_add() {
        let addr = PhysAddr::new(0x2000) + 0x18;
        assert_eq!(addr.as_usize(), 0x2018);
        assert_eq!(format!("{:08x}", addr), "00002018");
        assert_eq!(format!("{:?}", addr), "PhysAddr(0x00002018)");
    }

    #[test]
    fn test_phys_addr_add_wraps() {
        assert_eq!(PhysAddr::new(usize::MAX) + 0x10, PhysAddr::new(0xf));
    }

    struct FrameTable(HashMap<usize, u64>);

    impl VirtToPhysResolver for FrameTable {
        type Error = ();

        fn get_phys(&mut self, virt: usize) -> Result<PhysAddr, ()> {
            let pfn = self.0.get(&(virt >> PAGE_SHIFT)).ok_or(())?;
            Ok(PhysAddr::from_pfn(*pfn, virt & PAGE_MASK))
        }
    }

    #[test]
    fn test_contiguous_len() {
        let mut table = FrameTable(HashMap::from([(0x10, 0x800), (0x11, 0x801), (0x12, 0x900)]));
        let virt = (0x10 << PAGE_SHIFT) + 0x40;
        assert_eq!(table.get_phys(virt), Ok(PhysAddr::new(0x80_0040)));
        assert_eq!(table.contiguous_len(virt, 100), Ok(100));
        assert_eq!(
            table.contiguous_len(virt, 3 * PAGE_SIZE),
            Ok(2 * PAGE_SIZE - 0x40)
        );
        assert_eq!(table.contiguous_len(virt, 4 * PAGE_SIZE), Ok(2 * PAGE_SIZE - 0x40));
    }

    #[test]
    fn test_missing_page() {
        let mut table = FrameTable(HashMap::from([(0x10, 0x800)]));
        assert_eq!(table.contiguous_len(0x10 << PAGE_SHIFT, 2 * PAGE_SIZE), Err(()));
    }

    #[test]
    #[ignore = "needs /proc/self/pagemap"]
    fn test_linux_pagemap_resolves_heap() -> anyhow::Result<()> {
        let words = vec![0usize; 1024];
        let mut pagemap = LinuxPageMap::new()?;
        let virt = words.as_ptr().addr();
        let phys = pagemap.get_phys(virt)?;
        assert_eq!(phys.as_usize() & PAGE_MASK, virt & PAGE_MASK);
        assert!(pagemap.contiguous_len(virt, 8 * 1024)? > 0);
        Ok(())
    }
}
