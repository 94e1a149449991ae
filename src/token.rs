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

//! The token model (`spec.md` §3/§4.B). Numeric, string, directive,
//! label and keyword payloads are parsed once at construction time, so
//! everything downstream sees uniform, pre-validated tokens; the raw
//! source text is kept around only so diagnostics can point back at
//! it.

/// The parsed payload of a token. Variant names mirror `spec.md`'s
/// `NEWLINE | DIRECTIVE | HEX | UHEX | STRING | LABEL | LABEL_O |
/// KEYWORD` tags.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum TokenKind {
    Newline,
    /// Identifier following a leading `.`.
    Directive(String),
    /// Signed 64bit literal (`[+-]0x...`).
    Hex(i64),
    /// Unsigned 64bit literal (`0x...`).
    UHex(u64),
    /// Decoded byte string from a `"..."` literal.
    Str(Vec<u8>),
    /// Label reference/definition with no offset suffix.
    Label(String),
    /// Label reference with an explicit `±0xHEX` offset suffix.
    LabelOffset(String, i64),
    /// A bare identifier appearing where an instruction mnemonic
    /// fragment, section name, or directive argument is expected.
    Keyword(String),
}

/// A single lexical token: its parsed payload, source position, and
/// the original text span (for diagnostics only).
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize, text: String) -> Self {
        Self { kind, line, column, text }
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline)
    }

    /// The label name this token refers to, stripped of any offset
    /// suffix, if this is a `LABEL` or `LABEL_O` token.
    pub fn label_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Label(name) => Some(name),
            TokenKind::LabelOffset(name, _) => Some(name),
            _ => None,
        }
    }

    /// The explicit offset carried by a `LABEL_O` token, or `0` for a
    /// plain `LABEL` token. Only meaningful when [`Token::label_name`]
    /// returns `Some`.
    pub fn label_offset(&self) -> i64 {
        match &self.kind {
            TokenKind::LabelOffset(_, offset) => *offset,
            _ => 0,
        }
    }

    /// The keyword text, if this is a `KEYWORD` token.
    pub fn keyword(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Keyword(name) => Some(name),
            _ => None,
        }
    }

    /// The directive name (without the leading `.`), if this is a
    /// `DIRECTIVE` token.
    pub fn directive(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Directive(name) => Some(name),
            _ => None,
        }
    }
}
