//! The slice of the dex container format the interpreter consumes: method
//! bodies (16-bit code units), the try/catch-handler table, and shorty
//! signature strings.
//!
//! The container format itself is defined elsewhere and versioned; this
//! module decodes it exactly as published and adds nothing of its own.

pub mod insn;

pub use insn::{InsnRef, Opcode};

/// A method body as stored in the container: register counts, the
/// instruction stream, and the exception-handler table.
#[derive(Debug, Clone, Default)]
pub struct CodeItem {
    /// Total number of registers the method uses.
    pub registers_size: u16,
    /// Number of registers holding incoming arguments (the highest-indexed
    /// suffix of the register window).
    pub ins_size: u16,
    /// Instruction stream, in 16-bit code units.
    pub insns: Vec<u16>,
    /// Try items, sorted by start address and non-overlapping.
    pub tries: Vec<TryItem>,
}

impl CodeItem {
    /// The handler list guarding `dex_pc`, if any. Try items never overlap,
    /// so at most one item applies to a given position.
    pub fn handlers_at(&self, dex_pc: u32) -> Option<&[CatchHandler]> {
        self.tries
            .iter()
            .find(|t| t.contains(dex_pc))
            .map(|t| t.handlers.as_slice())
    }
}

/// A guarded code range and its ordered catch handlers.
#[derive(Debug, Clone)]
pub struct TryItem {
    /// First code unit covered by this item.
    pub start_addr: u32,
    /// Number of code units covered.
    pub insn_count: u32,
    /// Handlers in declaration order; the first match wins. A catch-all
    /// entry has no type and is last when present.
    pub handlers: Vec<CatchHandler>,
}

impl TryItem {
    /// Whether `dex_pc` falls inside this item's guarded range.
    #[inline]
    pub fn contains(&self, dex_pc: u32) -> bool {
        dex_pc >= self.start_addr && dex_pc < self.start_addr + self.insn_count
    }
}

/// One catch handler: the guarded exception type (by container type index)
/// and the handler's target position. `type_idx == None` is a catch-all.
#[derive(Debug, Clone)]
pub struct CatchHandler {
    /// Container type index of the caught class, or `None` for catch-all.
    pub type_idx: Option<u16>,
    /// Position of the handler's first instruction.
    pub address: u32,
}

/// Whether a shorty character denotes a two-register value.
#[inline]
pub fn shorty_is_wide(c: u8) -> bool {
    c == b'J' || c == b'D'
}

/// Whether a shorty character denotes an object reference.
#[inline]
pub fn shorty_is_reference(c: u8) -> bool {
    c == b'L'
}

/// Number of argument registers a shorty describes, not counting any
/// receiver. The first shorty character is the return type and is skipped.
pub fn num_arg_registers(shorty: &str) -> u16 {
    shorty
        .bytes()
        .skip(1)
        .map(|c| if shorty_is_wide(c) { 2 } else { 1 })
        .sum()
}
