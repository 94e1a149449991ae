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

//! The in-memory data model the assembler builds and the linker
//! serializes (`spec.md` §3): sections, linking units, executables,
//! and the bookkeeping the one-pass label patcher needs.

use crate::token::Token;

/// The seven section kinds a linking unit may carry, in the fixed
/// order the linker writes them.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum SectionType {
    Text,
    RoData,
    Data,
    Bss,
    Bind,
    PdBind,
    Debug,
}

impl SectionType {
    /// Section kinds in on-disk writing order (`spec.md` §4.F).
    pub const ORDER: [SectionType; 7] = [
        SectionType::Text,
        SectionType::RoData,
        SectionType::Data,
        SectionType::Bss,
        SectionType::Bind,
        SectionType::PdBind,
        SectionType::Debug,
    ];

    fn index(self) -> usize {
        SectionType::ORDER.iter().position(|s| *s == self).expect("exhaustive ORDER")
    }

    /// The on-disk type tag, NUL-padded to 32 bytes by the linker.
    pub fn tag(self) -> &'static str {
        match self {
            SectionType::Text => "TEXT",
            SectionType::RoData => "RODATA",
            SectionType::Data => "DATA",
            SectionType::Bss => "BSS",
            SectionType::Bind => "BIND",
            SectionType::PdBind => "PDBIND",
            SectionType::Debug => "DEBUG",
        }
    }

    /// Parses a `.section` directive argument (or a section tag read
    /// back off disk) into a `SectionType`.
    pub fn from_name(name: &str) -> Option<SectionType> {
        SectionType::ORDER.into_iter().find(|s| s.tag() == name)
    }
}

/// The payload shape backing a [`Section`], per the tag (`spec.md`
/// §9 "Mixed ownership of section payloads").
#[derive(Clone,Debug)]
enum Payload {
    Code(Vec<u64>),
    Bytes(Vec<u8>),
    Reserved(usize),
}

/// A single section's bytes (or code blocks, or reserved size) within
/// a linking unit.
#[derive(Clone,Debug)]
pub struct Section {
    section_type: SectionType,
    payload: Payload,
}

impl Section {
    fn new(section_type: SectionType) -> Self {
        let payload = match section_type {
            SectionType::Text => Payload::Code(Vec::new()),
            SectionType::Bss => Payload::Reserved(0),
            _ => Payload::Bytes(Vec::new()),
        };
        Self { section_type, payload }
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    /// Number of 64-bit code blocks written so far. Only meaningful
    /// for `Text`.
    pub fn code_block_count(&self) -> usize {
        match &self.payload {
            Payload::Code(blocks) => blocks.len(),
            _ => 0,
        }
    }

    pub fn code_blocks(&self) -> &[u64] {
        match &self.payload {
            Payload::Code(blocks) => blocks,
            _ => &[],
        }
    }

    pub fn push_code_block(&mut self, value: u64) {
        if let Payload::Code(blocks) = &mut self.payload {
            blocks.push(value);
        }
    }

    /// Overwrites a previously-emitted code block. Used to patch a
    /// resolved label slot.
    pub fn set_code_block(&mut self, index: usize, value: u64) {
        if let Payload::Code(blocks) = &mut self.payload {
            blocks[index] = value;
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.payload {
            Payload::Bytes(bytes) => bytes,
            _ => &[],
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        if let Payload::Bytes(bytes) = &mut self.payload {
            bytes.extend_from_slice(data);
        }
    }

    /// Grows a `Bss` section's reserved byte count.
    pub fn reserve(&mut self, n: usize) {
        if let Payload::Reserved(count) = &mut self.payload {
            *count += n;
        }
    }

    pub fn reserved_len(&self) -> usize {
        match &self.payload {
            Payload::Reserved(count) => *count,
            _ => 0,
        }
    }

    /// Byte length as the linker sees it: code blocks count as eight
    /// bytes apiece, reserved `Bss` space counts directly, everything
    /// else is its stored byte length.
    pub fn byte_len(&self) -> usize {
        match &self.payload {
            Payload::Code(blocks) => blocks.len() * 8,
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Reserved(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

/// A group of typed sections addressable as a single unit (`spec.md`
/// §3 "LinkingUnit"). At most one section of each [`SectionType`] is
/// present; sections are created lazily the first time they are
/// written to.
#[derive(Clone,Debug,Default)]
pub struct LinkingUnit {
    sections: [Option<Section>; 7],
    /// Count of `.bind` entries written so far, used as the write
    /// offset when a label is defined inside `Bind`.
    pub bindings_count: u32,
    /// Same as `bindings_count`, for `PdBind`.
    pub pd_bindings_count: u32,
}

impl LinkingUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections[section_type.index()].as_ref()
    }

    /// Returns the section for `section_type`, creating an empty one
    /// if it is not yet present.
    pub fn section_mut(&mut self, section_type: SectionType) -> &mut Section {
        self.sections[section_type.index()].get_or_insert_with(|| Section::new(section_type))
    }

    /// Iterates present, non-empty sections in on-disk order.
    pub fn present_sections(&self) -> impl Iterator<Item = &Section> {
        SectionType::ORDER.into_iter().filter_map(move |t| {
            self.sections[t.index()].as_ref().filter(|s| !s.is_empty())
        })
    }

    pub fn non_empty_section_count(&self) -> usize {
        self.present_sections().count()
    }

    /// A unit is valid iff at least one of its present sections holds
    /// data (`spec.md` §3 "LinkingUnit").
    pub fn is_valid(&self) -> bool {
        self.non_empty_section_count() > 0
    }
}

/// Ordered collection of linking units, with an active-unit cursor
/// (`spec.md` §3 "Executable"). At most 256 units, enforced by the
/// linker's `u8` unit-count field rather than here.
#[derive(Clone,Debug)]
pub struct Executable {
    units: Vec<LinkingUnit>,
    active_unit: u8,
}

impl Default for Executable {
    fn default() -> Self {
        Self { units: vec![LinkingUnit::new()], active_unit: 0 }
    }
}

impl Executable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[LinkingUnit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn active_unit(&self) -> u8 {
        self.active_unit
    }

    pub fn set_active_unit(&mut self, index: u8) {
        self.active_unit = index;
    }

    pub fn unit(&self, index: u8) -> &LinkingUnit {
        &self.units[index as usize]
    }

    pub fn unit_mut(&mut self, index: u8) -> &mut LinkingUnit {
        &mut self.units[index as usize]
    }

    /// Appends a new, empty linking unit, returning its index.
    pub fn push_unit(&mut self) -> u8 {
        self.units.push(LinkingUnit::new());
        (self.units.len() - 1) as u8
    }
}

/// Where a defined label points: either a real section within a unit,
/// or one of the three pseudo-sections that stand for "this unit's
/// read-only/read-write/zero data", selected by a VM-side sentinel
/// rather than an address.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum LabelSection {
    Real(SectionType),
    Pseudo,
}

/// Sentinel offsets used by the three built-in pseudo-labels
/// (`spec.md` §3 "LabelLocation").
pub const RODATA_SENTINEL: u64 = 1;
pub const DATA_SENTINEL: u64 = 2;
pub const BSS_SENTINEL: u64 = 3;

/// The resolved position of a defined label.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct LabelLocation {
    pub unit: u8,
    pub section: LabelSection,
    pub offset: u64,
}

impl LabelLocation {
    pub fn real(unit: u8, section: SectionType, offset: u64) -> Self {
        Self { unit, section: LabelSection::Real(section), offset }
    }

    fn pseudo(offset: u64) -> Self {
        Self { unit: 0, section: LabelSection::Pseudo, offset }
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self.section, LabelSection::Pseudo)
    }

    /// The three built-in pseudo-labels every fresh label table is
    /// seeded with.
    pub fn builtins() -> [(&'static str, LabelLocation); 3] {
        [
            ("RODATA", LabelLocation::pseudo(RODATA_SENTINEL)),
            ("DATA", LabelLocation::pseudo(DATA_SENTINEL)),
            ("BSS", LabelLocation::pseudo(BSS_SENTINEL)),
        ]
    }
}

/// A pending reference to an as-yet-undefined label (`spec.md` §3
/// "LabelSlot"). Always refers into the `Text` section of `unit`; the
/// `section` field is carried for parity with the data model and is
/// checked, not assumed, at resolution time.
#[derive(Clone,Debug)]
pub struct LabelSlot {
    pub unit: u8,
    pub section: SectionType,
    pub code_block_index: usize,
    pub extra_offset: i64,
    pub is_jump_relative: bool,
    pub jump_origin: usize,
    pub referring_token: Token,
}
