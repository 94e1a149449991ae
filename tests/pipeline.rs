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

//! Black-box tests exercising the lexer → assembler → linker pipeline
//! end to end, the way a caller of this crate (or the `smas` binary)
//! would use it.

use smvm_as::assembler;
use smvm_as::error::AssembleErrorKind;
use smvm_as::instructions::BuiltinDirectory;
use smvm_as::lexer;
use smvm_as::linker;
use smvm_as::util::ByteDecoder;

#[derive(Default, Debug)]
struct DecodeError;

fn assemble_and_link(src: &str) -> Vec<u8> {
    let tokens = lexer::tokenize(src.as_bytes()).expect("tokenize");
    let directory = BuiltinDirectory::new();
    let exe = assembler::assemble(&tokens, &directory).expect("assemble");
    linker::link(&exe, 0).expect("link")
}

#[test]
fn a_minimal_program_assembles_and_links() {
    let src = "\
.section TEXT
:start
nop
halt
";
    let bytes = assemble_and_link(src);

    // Common header: 32-byte tag + 8-byte marker + 2-byte version.
    assert_eq!(&bytes[0..21], b"Sharemind Executable\0");
    let marker = u64::from_le_bytes(bytes[32..40].try_into().unwrap());
    assert_eq!(marker, 0x0123_4567_89AB_CDEF);
    let version = u16::from_le_bytes(bytes[40..42].try_into().unwrap());
    assert_eq!(version, 0);
}

#[test]
fn forward_and_backward_jumps_resolve_in_one_pass() {
    let src = "\
.section TEXT
:loop
nop
jmp_imm :loop
jmp_imm :after
:after
halt
";
    let bytes = assemble_and_link(src);
    let mut dec = ByteDecoder::new(&bytes);
    dec.match_tag::<DecodeError>("Sharemind Executable", 32, |_| DecodeError).expect("magic");
    let _marker = dec.decode_u64::<DecodeError>().expect("marker");
    let _version = dec.decode_u16::<DecodeError>().expect("version");
    let _units_minus_one = dec.decode_u8::<DecodeError>().expect("units");
    let _active = dec.decode_u8::<DecodeError>().expect("active");
    let _v0_pad = dec.decode_bytes::<DecodeError>(4).expect("v0 pad");
    dec.match_tag::<DecodeError>("Linking Unit", 32, |_| DecodeError).expect("unit tag");
    let _sections_minus_one = dec.decode_u8::<DecodeError>().expect("sections");
    let _unit_pad = dec.decode_bytes::<DecodeError>(7).expect("unit pad");
    dec.match_tag::<DecodeError>("TEXT", 32, |_| DecodeError).expect("text tag");
    let block_count = dec.decode_u32::<DecodeError>().expect("length");
    assert_eq!(block_count, 6);
    let _text_pad = dec.decode_bytes::<DecodeError>(4).expect("text pad");

    let mut blocks = Vec::new();
    for _ in 0..block_count {
        blocks.push(dec.decode_u64::<DecodeError>().expect("block"));
    }
    // block 0: nop
    assert_eq!(blocks[0], 0);
    // block 1: jmp_imm opcode, block 2: its patched backward argument (loop at block 0)
    assert_eq!(blocks[2] as i64, 0 - 1);
    // block 3: jmp_imm opcode, block 4: its patched forward argument (after at block 5)
    assert_eq!(blocks[4] as i64, 5 - 3);
}

#[test]
fn undefined_label_is_reported_with_the_referring_token() {
    let src = "\
.section TEXT
jmp_imm :nowhere
";
    let tokens = lexer::tokenize(src.as_bytes()).expect("tokenize");
    let directory = BuiltinDirectory::new();
    let err = assembler::assemble(&tokens, &directory).expect_err("should fail");
    assert_eq!(err.kind, AssembleErrorKind::UndefinedLabel);
    assert!(err.token.is_some());
}

#[test]
fn data_and_bss_sections_occupy_their_own_space() {
    let src = "\
.section RODATA
:greeting
.data string \"hi\"
.section BSS
:scratch
.fill 0x10 uint8
";
    let bytes = assemble_and_link(src);
    let mut dec = ByteDecoder::new(&bytes);
    dec.match_tag::<DecodeError>("Sharemind Executable", 32, |_| DecodeError).expect("magic");
    let _marker = dec.decode_u64::<DecodeError>().expect("marker");
    let _version = dec.decode_u16::<DecodeError>().expect("version");
    let _units_minus_one = dec.decode_u8::<DecodeError>().expect("units");
    let _active = dec.decode_u8::<DecodeError>().expect("active");
    let _v0_pad = dec.decode_bytes::<DecodeError>(4).expect("v0 pad");
    dec.match_tag::<DecodeError>("Linking Unit", 32, |_| DecodeError).expect("unit tag");
    let sections_minus_one = dec.decode_u8::<DecodeError>().expect("sections");
    assert_eq!(sections_minus_one, 1); // RODATA + BSS, no TEXT present
    let _unit_pad = dec.decode_bytes::<DecodeError>(7).expect("unit pad");

    dec.match_tag::<DecodeError>("RODATA", 32, |_| DecodeError).expect("rodata tag");
    let rodata_len = dec.decode_u32::<DecodeError>().expect("rodata length");
    assert_eq!(rodata_len, 2);
    let _rodata_pad = dec.decode_bytes::<DecodeError>(4).expect("rodata pad");
    let rodata_bytes = dec.decode_bytes::<DecodeError>(8).expect("rodata payload (padded to 8)");
    assert_eq!(&rodata_bytes[0..2], b"hi");

    dec.match_tag::<DecodeError>("BSS", 32, |_| DecodeError).expect("bss tag");
    let bss_len = dec.decode_u32::<DecodeError>().expect("bss length");
    assert_eq!(bss_len, 16);
    let _bss_pad = dec.decode_bytes::<DecodeError>(4).expect("bss pad");
    assert_eq!(dec.position(), bytes.len());
}
