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

//! The linker / file emitter (`spec.md` §4.F): serializes an
//! [`Executable`] into the versioned binary executable format. Pure
//! function of its input — no I/O, no global state.

use crate::error::LinkError;
use crate::executable::{Executable, Section, SectionType};
use crate::util::ByteEncoder;

/// The fixed ASCII magic carried by every executable's common header.
const MAGIC_STRING: &str = "Sharemind Executable";
/// Byte-order marker: readers verify it decodes back unchanged.
const BYTE_ORDER_MARKER: u64 = 0x0123_4567_89AB_CDEF;
const UNIT_TAG: &str = "Linking Unit";

/// Serializes `exe` as a version-`version` executable image. Only
/// version `0` is implemented; anything else is `UnsupportedVersion`.
pub fn link(exe: &Executable, version: u16) -> Result<Vec<u8>, LinkError> {
    match version {
        0 => link_v0(exe),
        v => Err(LinkError::UnsupportedVersion(v)),
    }
}

fn link_v0(exe: &Executable) -> Result<Vec<u8>, LinkError> {
    let unit_count = exe.unit_count();
    if unit_count == 0 || unit_count > 256 {
        return Err(LinkError::ExecutableTooLarge("linking unit count"));
    }

    let mut enc = ByteEncoder::new();
    enc.encode_tag(MAGIC_STRING, 32);
    enc.encode_u64(BYTE_ORDER_MARKER);
    enc.encode_u16(0);

    enc.encode_u8((unit_count - 1) as u8);
    enc.encode_u8(exe.active_unit());
    enc.encode_zeros(4);

    for unit in exe.units() {
        let sections: Vec<&Section> = unit.present_sections().collect();
        if sections.is_empty() {
            return Err(LinkError::ExecutableTooLarge("linking unit with no non-empty sections"));
        }
        if sections.len() > 256 {
            return Err(LinkError::ExecutableTooLarge("section count"));
        }
        enc.encode_tag(UNIT_TAG, 32);
        enc.encode_u8((sections.len() - 1) as u8);
        enc.encode_zeros(7);

        for section in sections {
            write_section(&mut enc, section)?;
        }
    }

    Ok(enc.to_vec())
}

fn write_section(enc: &mut ByteEncoder, section: &Section) -> Result<(), LinkError> {
    let length = match section.section_type() {
        SectionType::Text => section.code_block_count(),
        SectionType::Bss => section.reserved_len(),
        _ => section.byte_len(),
    };
    if length > (u32::MAX as usize) {
        return Err(LinkError::ExecutableTooLarge("section length"));
    }

    enc.encode_tag(section.section_type().tag(), 32);
    enc.encode_u32(length as u32);
    enc.encode_zeros(4);

    match section.section_type() {
        SectionType::Text => {
            for block in section.code_blocks() {
                enc.encode_u64(*block);
            }
        }
        SectionType::Bss => {
            // Reserved-only: no payload bytes at all.
        }
        _ => {
            let bytes = section.bytes();
            enc.encode_bytes(bytes);
            enc.encode_zeros((8 - (bytes.len() % 8)) % 8);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ByteDecoder;

    #[derive(Default, Debug)]
    struct DecodeError;

    fn unit_header_offset() -> usize {
        32 + 8 + 2 + 6
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let exe = Executable::new();
        assert_eq!(link(&exe, 1), Err(LinkError::UnsupportedVersion(1)));
    }

    #[test]
    fn v0_header_round_trips() {
        let mut exe = Executable::new();
        exe.unit_mut(0).section_mut(SectionType::Text).push_code_block(0);
        exe.push_unit();
        exe.unit_mut(1).section_mut(SectionType::Text).push_code_block(0);
        exe.set_active_unit(1);

        let bytes = link(&exe, 0).expect("link");
        let mut dec = ByteDecoder::new(&bytes);
        dec.match_tag::<DecodeError>(MAGIC_STRING, 32, |_| DecodeError).expect("magic");
        let marker: u64 = dec.decode_u64::<DecodeError>().expect("marker");
        assert_eq!(marker, BYTE_ORDER_MARKER);
        let version: u16 = dec.decode_u16::<DecodeError>().expect("version");
        assert_eq!(version, 0);
        let units_minus_one: u8 = dec.decode_u8::<DecodeError>().expect("units");
        assert_eq!(units_minus_one, 1);
        let active: u8 = dec.decode_u8::<DecodeError>().expect("active");
        assert_eq!(active, 1);
    }

    #[test]
    fn bss_section_has_length_but_no_payload_bytes() {
        let mut exe = Executable::new();
        exe.unit_mut(0).section_mut(SectionType::Bss).reserve(1024);
        let bytes = link(&exe, 0).expect("link");

        let mut dec = ByteDecoder::new(&bytes);
        dec.match_tag::<DecodeError>(MAGIC_STRING, 32, |_| DecodeError).expect("magic");
        let _marker: u64 = dec.decode_u64::<DecodeError>().expect("marker");
        let _version: u16 = dec.decode_u16::<DecodeError>().expect("version");
        let _units_minus_one: u8 = dec.decode_u8::<DecodeError>().expect("units");
        let _active: u8 = dec.decode_u8::<DecodeError>().expect("active");
        let _padding: &[u8] = dec.decode_bytes::<DecodeError>(4).expect("v0 padding");
        dec.match_tag::<DecodeError>(UNIT_TAG, 32, |_| DecodeError).expect("unit tag");
        let _sections_minus_one: u8 = dec.decode_u8::<DecodeError>().expect("sections");
        let _unit_padding: &[u8] = dec.decode_bytes::<DecodeError>(7).expect("unit padding");
        dec.match_tag::<DecodeError>("BSS", 32, |_| DecodeError).expect("bss tag");
        let length: u32 = dec.decode_u32::<DecodeError>().expect("length");
        assert_eq!(length, 1024);
        // No payload bytes follow: the decoder position is exactly
        // unit_header_offset() + 40 (unit header) + 40 (section header).
        assert_eq!(dec.position(), unit_header_offset() + 40 + 40);
        assert_eq!(dec.position(), bytes.len());
    }

    #[test]
    fn non_bss_section_payload_is_padded_to_eight_bytes() {
        let mut exe = Executable::new();
        exe.unit_mut(0).section_mut(SectionType::RoData).push_bytes(b"abc");
        let bytes = link(&exe, 0).expect("link");

        let payload_start = unit_header_offset() + 40 + 40;
        assert_eq!(&bytes[payload_start..payload_start + 3], b"abc");
        assert_eq!(&bytes[payload_start + 3..payload_start + 8], &[0, 0, 0, 0, 0]);
        assert_eq!(bytes.len(), payload_start + 8);
    }

    #[test]
    fn empty_executable_has_no_non_empty_sections_and_fails_to_link() {
        let exe = Executable::new();
        assert_eq!(link(&exe, 0), Err(LinkError::ExecutableTooLarge("linking unit with no non-empty sections")));
    }
}
