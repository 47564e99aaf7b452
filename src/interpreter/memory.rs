//! Simulated address space.
//!
//! The stack occupies `[0, STACK_TOP)` and is always accessible; the program moves `sp` itself.
//! The heap starts at `HEAP_BASE` and hands out 8-byte aligned blocks from a bump pointer.
//! Heap addresses are never reused, so any access to a freed block is caught. Freed blocks
//! drop their bytes but keep an entry in the block map, so the map grows with every `malloc`
//! for the life of the run.

use std::collections::BTreeMap;

use crate::ast::AccessSize;

pub const STACK_TOP: u64 = 102_400;
pub const HEAP_BASE: u64 = 204_800;
/// Upper bound on live heap bytes.
pub const HEAP_LIMIT: u64 = 64 << 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryFault {
    #[error("allocating zero bytes")]
    ZeroSizedAlloc,
    #[error("heap exhausted: {requested} bytes requested, {in_use} in use")]
    HeapExhausted { requested: u64, in_use: u64 },
    #[error("out-of-bounds access of {size} bytes at address {addr}")]
    OutOfBounds { addr: u64, size: u64 },
    #[error("unaligned access of {size} bytes at address {addr}")]
    Unaligned { addr: u64, size: u64 },
    #[error("use after free at address {addr}")]
    UseAfterFree { addr: u64 },
    #[error("double free of address {addr}")]
    DoubleFree { addr: u64 },
    #[error("freeing an invalid pointer {addr}")]
    InvalidFree { addr: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Stack,
    Heap,
}

#[derive(Debug)]
struct HeapBlock {
    size: u64,
    data: Vec<u8>,
    live: bool,
}

#[derive(Debug)]
pub struct Memory {
    stack: Vec<u8>,
    /// Lowest stack address touched so far.
    stack_low: u64,
    heap: BTreeMap<u64, HeapBlock>,
    next_heap: u64,
    heap_in_use: u64,
    max_alloced: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

fn round_up(size: u64) -> u64 {
    size.div_ceil(8) * 8
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            stack: vec![0; STACK_TOP as usize],
            stack_low: STACK_TOP,
            heap: BTreeMap::new(),
            next_heap: HEAP_BASE,
            heap_in_use: 0,
            max_alloced: 0,
        }
    }

    pub fn max_alloced_size(&self) -> u64 {
        self.max_alloced
    }

    pub fn heap_in_use(&self) -> u64 {
        self.heap_in_use
    }

    pub fn stack_in_use(&self) -> u64 {
        STACK_TOP - self.stack_low
    }

    fn update_high_water(&mut self) {
        self.max_alloced = self.max_alloced.max(self.heap_in_use + self.stack_in_use());
    }

    pub fn malloc(&mut self, size: u64) -> Result<u64, MemoryFault> {
        if size == 0 {
            return Err(MemoryFault::ZeroSizedAlloc);
        }
        if size > HEAP_LIMIT || self.heap_in_use + round_up(size) > HEAP_LIMIT {
            return Err(MemoryFault::HeapExhausted { requested: size, in_use: self.heap_in_use });
        }
        let rounded = round_up(size);
        let addr = self.next_heap;
        self.next_heap += rounded;
        self.heap.insert(addr, HeapBlock { size, data: vec![0; size as usize], live: true });
        self.heap_in_use += rounded;
        self.update_high_water();
        Ok(addr)
    }

    /// Release a heap block. Freeing address 0 is a no-op.
    pub fn free(&mut self, addr: u64) -> Result<(), MemoryFault> {
        if addr == 0 {
            return Ok(());
        }
        match self.heap.get_mut(&addr) {
            Some(block) if block.live => {
                block.live = false;
                block.data = Vec::new();
                self.heap_in_use -= round_up(block.size);
                Ok(())
            }
            Some(_) => Err(MemoryFault::DoubleFree { addr }),
            None => Err(MemoryFault::InvalidFree { addr }),
        }
    }

    /// Check an access and classify it. Returns the heap block base for heap accesses.
    fn locate(&self, addr: u64, size: u64) -> Result<(Region, u64), MemoryFault> {
        if addr % size != 0 {
            return Err(MemoryFault::Unaligned { addr, size });
        }
        let end = addr.checked_add(size).ok_or(MemoryFault::OutOfBounds { addr, size })?;
        if end <= STACK_TOP {
            return Ok((Region::Stack, 0));
        }
        if addr >= HEAP_BASE {
            if let Some((&base, block)) = self.heap.range(..=addr).next_back() {
                if end <= base + block.size {
                    if !block.live {
                        return Err(MemoryFault::UseAfterFree { addr });
                    }
                    return Ok((Region::Heap, base));
                }
            }
        }
        Err(MemoryFault::OutOfBounds { addr, size })
    }

    fn bytes_mut(&mut self, addr: u64, size: u64) -> Result<(Region, &mut [u8]), MemoryFault> {
        let (region, base) = self.locate(addr, size)?;
        match region {
            Region::Stack => {
                self.stack_low = self.stack_low.min(addr);
                self.update_high_water();
                Ok((region, &mut self.stack[addr as usize..(addr + size) as usize]))
            }
            Region::Heap => {
                let block = self.heap.get_mut(&base).ok_or(MemoryFault::OutOfBounds { addr, size })?;
                let off = (addr - base) as usize;
                Ok((region, &mut block.data[off..off + size as usize]))
            }
        }
    }

    pub fn load(&mut self, addr: u64, size: AccessSize) -> Result<(u64, Region), MemoryFault> {
        let (region, bytes) = self.bytes_mut(addr, size.bytes())?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok((u64::from_le_bytes(buf), region))
    }

    pub fn store(&mut self, addr: u64, size: AccessSize, value: u64) -> Result<Region, MemoryFault> {
        let (region, bytes) = self.bytes_mut(addr, size.bytes())?;
        let len = bytes.len();
        bytes.copy_from_slice(&value.to_le_bytes()[..len]);
        Ok(region)
    }
}
