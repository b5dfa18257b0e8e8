use crate::memory::Word;

/// Size of a native [`Word`] in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Page shift value (12 bits) for 4KB pages
pub const PAGE_SHIFT: usize = 12;
/// Standard page size (4096 bytes)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Mask for extracting page offset
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Cache line size (64 bytes) for x86_64
pub const CL_SIZE: usize = 64;

/// Number of words written between two progress ticks of the random value test
pub const PROGRESS_OFTEN: usize = 2500;

/// Number of alternating pattern iterations of the stuck address test
pub const STUCK_ADDRESS_ITERATIONS: usize = 16;
