// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The instruction directory (component D, `spec.md` §2/§6). This is
//! deliberately thin: the real mnemonic→opcode table lives outside
//! this crate's core (a VM-specific fixed directory), and the
//! assembler only ever consumes it through [`InstructionDirectory`].
//! [`BuiltinDirectory`] is a small concrete table, enough to assemble
//! and test real programs, not a claim about the full SMVM opcode
//! space.

/// A mnemonic's opcode and expected argument count, as the assembler
/// needs it.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct InstructionInfo {
    pub code: u64,
    pub num_args: usize,
}

impl InstructionInfo {
    pub const fn new(code: u64, num_args: usize) -> Self {
        Self { code, num_args }
    }

    /// An instruction's first argument is jump-relative iff opcode
    /// byte 0 is `0x04` and byte 2 is `0x01` (`spec.md` §4.E.3, §6).
    pub fn is_jump_relative(&self) -> bool {
        let bytes = self.code.to_le_bytes();
        bytes[0] == 0x04 && bytes[2] == 0x01
    }
}

/// Read-only lookup from a joined mnemonic to its [`InstructionInfo`].
/// Implementations are free to back this with a static table, a
/// loaded VM descriptor file, or anything else; the assembler only
/// ever calls `lookup`.
pub trait InstructionDirectory {
    fn lookup(&self, mnemonic: &str) -> Option<InstructionInfo>;
}

/// A fixed, in-memory instruction table covering a small but
/// representative slice of SMVM opcodes: enough to assemble jumps,
/// no-ops, and simple register/immediate moves.
pub struct BuiltinDirectory {
    entries: &'static [(&'static str, InstructionInfo)],
}

impl BuiltinDirectory {
    pub const fn new() -> Self {
        Self { entries: Self::TABLE }
    }

    const TABLE: &'static [(&'static str, InstructionInfo)] = &[
        ("nop", InstructionInfo::new(0x0000_0000_0000_0000, 0)),
        ("halt", InstructionInfo::new(0x0000_0000_0000_0001, 0)),
        ("jmp_imm", InstructionInfo::new(0x0000_0000_0100_0004, 1)),
        ("jmp_rel_imm", InstructionInfo::new(0x0000_0000_0100_0005, 1)),
        ("jz_imm", InstructionInfo::new(0x0000_0000_0100_0006, 2)),
        ("mov_imm_reg", InstructionInfo::new(0x0000_0000_0000_0010, 2)),
        ("mov_reg_reg", InstructionInfo::new(0x0000_0000_0000_0011, 2)),
        ("push_imm", InstructionInfo::new(0x0000_0000_0000_0020, 1)),
        ("pop", InstructionInfo::new(0x0000_0000_0000_0021, 0)),
        ("call_imm", InstructionInfo::new(0x0000_0000_0100_0030, 1)),
        ("ret", InstructionInfo::new(0x0000_0000_0000_0031, 0)),
    ];
}

impl Default for BuiltinDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionDirectory for BuiltinDirectory {
    fn lookup(&self, mnemonic: &str) -> Option<InstructionInfo> {
        self.entries.iter().find(|(name, _)| *name == mnemonic).map(|(_, info)| *info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jmp_imm_is_jump_relative() {
        let dir = BuiltinDirectory::new();
        let info = dir.lookup("jmp_imm").expect("jmp_imm");
        assert!(info.is_jump_relative());
    }

    #[test]
    fn nop_is_not_jump_relative() {
        let dir = BuiltinDirectory::new();
        let info = dir.lookup("nop").expect("nop");
        assert!(!info.is_jump_relative());
    }

    #[test]
    fn unknown_mnemonic_is_absent() {
        let dir = BuiltinDirectory::new();
        assert!(dir.lookup("frobnicate").is_none());
    }
}
