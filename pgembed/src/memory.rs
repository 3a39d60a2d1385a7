//! Allocation helpers and the auto memory arena.
//!
//! Output variables given as [`Slot::Pointer`][crate::value::Slot] are
//! resized by the runtime. Every such resize is registered in the thread
//! arena so a failed statement can roll its outputs back, and so the caller
//! can tell how much storage the runtime handed over.
use std::cell::RefCell;

use crate::{
    Result,
    common::debug_log,
    sqlca::{self, code, state},
};

/// A storage block the runtime allocated on behalf of the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoMem {
    pub line: i32,
    pub bytes: usize,
}

thread_local! {
    static AUTO_MEM: RefCell<Vec<AutoMem>> = const { RefCell::new(Vec::new()) };
}

/// Register a block allocated on behalf of the caller.
pub(crate) fn add_mem(line: i32, bytes: usize) {
    AUTO_MEM.with_borrow_mut(|mem| mem.push(AutoMem { line, bytes }));
}

/// Forget every registration, ownership of the blocks stays with the caller.
pub fn clear_auto_mem() {
    AUTO_MEM.with_borrow_mut(Vec::clear);
}

/// Release the arena.
///
/// Draining an already empty arena is a no-op.
pub fn free_auto_mem() {
    let drained = AUTO_MEM.with_borrow_mut(std::mem::take);
    if !drained.is_empty() {
        let bytes = drained.iter().map(|m| m.bytes).sum::<usize>();
        debug_log!("free_auto_mem: releasing {} blocks ({bytes} bytes)", drained.len());
    }
}

/// Snapshot of the current registrations.
pub fn auto_mem() -> Vec<AutoMem> {
    AUTO_MEM.with_borrow(Clone::clone)
}

/// Resize `vec` to `len` default elements, raising `out of memory` when the
/// reservation fails.
pub(crate) fn alloc_vec<T: Clone + Default>(vec: &mut Vec<T>, len: usize, line: i32) -> Result<()> {
    vec.clear();
    reserve(vec, len, line)?;
    vec.resize(len, T::default());
    Ok(())
}

/// Reserve room for `additional` more elements.
pub(crate) fn reserve<T>(vec: &mut Vec<T>, additional: usize, line: i32) -> Result<()> {
    match vec.try_reserve_exact(additional) {
        Ok(()) => Ok(()),
        Err(_) => Err(sqlca::raise(line, code::OUT_OF_MEMORY, state::OUT_OF_MEMORY, None)),
    }
}

/// Allocate a zeroed buffer.
pub(crate) fn alloc(len: usize, line: i32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    alloc_vec(&mut buf, len, line)?;
    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_free_is_idempotent() {
        clear_auto_mem();
        add_mem(3, 16);
        add_mem(3, 8);
        assert_eq!(auto_mem().len(), 2);
        free_auto_mem();
        assert!(auto_mem().is_empty());
        free_auto_mem();
        assert!(auto_mem().is_empty());
    }

    #[test]
    fn test_alloc_vec() {
        let mut v = vec![1u32, 2, 3, 4, 5];
        alloc_vec(&mut v, 3, 1).unwrap();
        assert_eq!(v, [0, 0, 0]);
        assert_eq!(alloc(4, 1).unwrap(), [0; 4]);
    }

    #[test]
    fn test_alloc_failure_raises() {
        crate::sqlca::init();
        let mut v = Vec::<u64>::new();
        let err = alloc_vec(&mut v, usize::MAX / 2, 7).unwrap_err();
        assert_eq!(err.sqlcode(), -12);
        assert_eq!(crate::sqlca::get().sqlstate_str(), "YE001");
    }
}
