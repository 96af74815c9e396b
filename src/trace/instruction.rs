//! This module contains the instruction abstraction supplied by the decoding
//! collaborator, along with a concrete instruction record type.

use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use downcast_rs::{impl_downcast, DowncastSync};

use crate::data::Address;

/// The interface to one decoded instruction in an execution trace.
///
/// Condition calculation only needs to know where an instruction is and
/// whether it is a conditional direct branch; everything else an
/// implementation records is available to clients by downcasting.
pub trait InstructionRecord
where
    Self: Debug + DowncastSync,
{
    /// Gets the address of the instruction.
    #[must_use]
    fn address(&self) -> Address;

    /// Checks if the instruction is a conditional direct branch, and hence
    /// consumes a bit of the path code.
    #[must_use]
    fn is_conditional_direct_branch(&self) -> bool;
}
impl_downcast!(sync InstructionRecord);

/// A dynamically dispatched, shared, [`InstructionRecord`].
pub type DynInstruction = Arc<dyn InstructionRecord>;

/// An architectural register, identified by the decoder's register number.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Register(pub u16);

/// The properties of an instruction observed when it was decoded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InstructionFlags {
    /// The instruction enters the kernel.
    pub is_syscall: bool,

    /// The instruction reads from memory.
    pub is_memory_read: bool,

    /// The instruction writes to memory.
    pub is_memory_write: bool,

    /// The instruction performs a second, independent, memory read.
    pub has_second_memory_read: bool,

    /// The instruction carries a `rep` prefix that actually repeats it.
    pub has_real_rep: bool,

    /// The instruction is a conditional branch to a fixed target.
    pub is_conditional_direct_branch: bool,

    /// The instruction is an unconditional branch to a computed target.
    pub is_unconditional_indirect: bool,
}

/// A decoded instruction as recorded by the tracer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    address:       Address,
    disassembly:   String,
    image:         Option<String>,
    function:      Option<String>,
    flags:         InstructionFlags,
    src_registers: BTreeSet<Register>,
    dst_registers: BTreeSet<Register>,
}

impl Instruction {
    /// Constructs a new instruction at `address` with the textual
    /// `disassembly`, and no other recorded properties.
    #[must_use]
    pub fn new(address: Address, disassembly: impl Into<String>) -> Self {
        let disassembly = disassembly.into();
        Self {
            address,
            disassembly,
            image: None,
            function: None,
            flags: InstructionFlags::default(),
            src_registers: BTreeSet::new(),
            dst_registers: BTreeSet::new(),
        }
    }

    /// Constructs a conditional direct branch at `address`.
    #[must_use]
    pub fn conditional_branch(address: Address, disassembly: impl Into<String>) -> Self {
        let flags = InstructionFlags {
            is_conditional_direct_branch: true,
            ..InstructionFlags::default()
        };
        Self::new(address, disassembly).with_flags(flags)
    }

    /// Sets the name of the image that contains the instruction.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the name of the function that contains the instruction.
    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Sets the decoded properties of the instruction.
    #[must_use]
    pub fn with_flags(mut self, flags: InstructionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the registers read and written by the instruction.
    #[must_use]
    pub fn with_registers(
        mut self,
        src: impl IntoIterator<Item = Register>,
        dst: impl IntoIterator<Item = Register>,
    ) -> Self {
        self.src_registers = src.into_iter().collect();
        self.dst_registers = dst.into_iter().collect();
        self
    }

    /// Wraps the instruction into a [`DynInstruction`].
    #[must_use]
    pub fn in_arc(self) -> DynInstruction {
        Arc::new(self)
    }

    /// Gets the disassembled text of the instruction.
    #[must_use]
    pub fn disassembly(&self) -> &str {
        &self.disassembly
    }

    /// Gets the name of the image containing the instruction, if any.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Gets the name of the function containing the instruction, if known.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// Gets the decoded properties of the instruction.
    #[must_use]
    pub fn flags(&self) -> &InstructionFlags {
        &self.flags
    }

    /// Gets the registers the instruction reads.
    #[must_use]
    pub fn src_registers(&self) -> &BTreeSet<Register> {
        &self.src_registers
    }

    /// Gets the registers the instruction writes.
    #[must_use]
    pub fn dst_registers(&self) -> &BTreeSet<Register> {
        &self.dst_registers
    }

    /// Checks if the instruction lives outside of any loaded image, which the
    /// tracer takes to mean it was mapped in from the kernel.
    #[must_use]
    pub fn is_mapped_from_kernel(&self) -> bool {
        self.image.is_none()
    }
}

impl InstructionRecord for Instruction {
    fn address(&self) -> Address {
        self.address
    }

    fn is_conditional_direct_branch(&self) -> bool {
        self.flags.is_conditional_direct_branch
    }
}

#[cfg(test)]
mod test {
    use crate::{
        data::Address,
        trace::instruction::{Instruction, InstructionRecord, Register},
    };

    #[test]
    fn conditional_branches_are_flagged() {
        let branch = Instruction::conditional_branch(Address::new(0x400), "jz 0x410");
        let plain = Instruction::new(Address::new(0x404), "mov eax, ebx");

        assert!(branch.is_conditional_direct_branch());
        assert!(!plain.is_conditional_direct_branch());
    }

    #[test]
    fn instructions_without_images_are_kernel_mapped() {
        let user = Instruction::new(Address::new(0x400), "nop").with_image("ls");
        let kernel = Instruction::new(Address::new(0xffff_0000), "syscall");

        assert!(!user.is_mapped_from_kernel());
        assert!(kernel.is_mapped_from_kernel());
    }

    #[test]
    fn records_can_be_downcast_to_instructions() {
        let record = Instruction::new(Address::new(0x400), "cmp eax, 1")
            .with_function("main")
            .with_registers([Register(0)], [])
            .in_arc();
        let instruction = record
            .downcast_ref::<Instruction>()
            .expect("Record is an instruction");

        assert_eq!(instruction.disassembly(), "cmp eax, 1");
        assert_eq!(instruction.function(), Some("main"));
        assert!(instruction.src_registers().contains(&Register(0)));
        assert!(instruction.dst_registers().is_empty());
    }
}
