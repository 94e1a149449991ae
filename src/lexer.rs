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

//! The DFA lexer (`spec.md` §4.C / §6). Turns a raw source buffer into
//! a flat `Vec<Token>`, tracking line and column as it goes so errors
//! downstream can point back at the right place.

use crate::error::LexError;
use crate::numeric::read_hex;
use crate::token::{Token, TokenKind};

/// Tokenizes an entire source buffer. A leading UTF-8 BOM is skipped.
/// Blank-line runs collapse to a single `NEWLINE`, and any trailing
/// `NEWLINE`s are dropped so the returned stream never ends on a blank
/// line.
pub fn tokenize(input: &[u8]) -> Result<Vec<Token>, LexError> {
    log::trace!("tokenizing {} byte(s) of source", input.len());
    let mut cursor = Cursor::new(input);
    cursor.skip_bom();
    let mut tokens = Vec::new();

    loop {
        cursor.skip_hspace();
        match cursor.current() {
            None => break,
            Some(b'#') => cursor.skip_comment(),
            Some(b'\n') => {
                let (line, column) = cursor.pos();
                cursor.advance();
                if !tokens.last().map(Token::is_newline).unwrap_or(false) {
                    tokens.push(Token::new(TokenKind::Newline, line, column, "\n".to_string()));
                }
            }
            Some(b'.') => tokens.push(cursor.scan_directive()?),
            Some(b'+') | Some(b'-') => tokens.push(cursor.scan_signed_hex()?),
            Some(b'0') => tokens.push(cursor.scan_unsigned_hex()?),
            Some(b'"') => tokens.push(cursor.scan_string()?),
            Some(b':') => tokens.push(cursor.scan_label()?),
            Some(b) if is_ident_start(b) => tokens.push(cursor.scan_keyword()?),
            Some(_) => {
                let (line, column) = cursor.pos();
                return Err(LexError::new(line, column));
            }
        }
    }

    while tokens.last().map(Token::is_newline).unwrap_or(false) {
        tokens.pop();
    }

    log::trace!("produced {} token(s)", tokens.len());
    Ok(tokens)
}

fn is_hspace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | 0x0B | 0x0C)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Decodes the backslash escapes a string literal may contain. An
/// escape naming an unrecognised character yields that character
/// verbatim, without the backslash.
fn decode_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            let decoded = match raw[i + 1] {
                b'n' => b'\n',
                b'r' => b'\r',
                b't' => b'\t',
                b'v' => 0x0B,
                b'b' => 0x08,
                b'f' => 0x0C,
                b'a' => 0x07,
                b'0' => 0x00,
                other => other,
            };
            out.push(decoded);
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// Byte cursor with line/column tracking. The BOM is consumed directly
/// rather than via `advance`, so it does not perturb column counting.
struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0, line: 1, column: 1 }
    }

    fn pos(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn byte_pos(&self) -> usize {
        self.pos
    }

    fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.current()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn skip_bom(&mut self) {
        if self.input.len() >= 3 && &self.input[0..3] == [0xEF, 0xBB, 0xBF] {
            self.pos = 3;
        }
    }

    fn skip_hspace(&mut self) {
        while let Some(b) = self.current() {
            if is_hspace(b) { self.advance(); } else { break; }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(b) = self.current() {
            if b == b'\n' { break; }
            self.advance();
        }
    }

    fn text_since(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Scans a hex-digit run of one to sixteen digits starting at the
    /// current position, returning its raw magnitude. Fails if there
    /// are no digits, or more than sixteen.
    fn scan_hex_digits(&mut self, origin: (usize, usize)) -> Result<u64, LexError> {
        let start = self.byte_pos();
        let mut count = 0usize;
        while let Some(b) = self.current() {
            if b.is_ascii_hexdigit() {
                self.advance();
                count += 1;
            } else {
                break;
            }
        }
        if count == 0 || count > 16 {
            return Err(LexError::new(origin.0, origin.1));
        }
        Ok(read_hex(&self.input[start..self.byte_pos()]))
    }

    /// Consumes a `0x` prefix, at the current position, failing with
    /// `origin` if it is not there.
    fn expect_0x(&mut self, origin: (usize, usize)) -> Result<(), LexError> {
        if self.current() != Some(b'0') {
            return Err(LexError::new(origin.0, origin.1));
        }
        self.advance();
        if self.current() != Some(b'x') {
            return Err(LexError::new(origin.0, origin.1));
        }
        self.advance();
        Ok(())
    }

    /// Converts a hex magnitude into a signed value, applying the
    /// `spec.md` §4.A boundary rule: a negative literal may have
    /// magnitude up to and including `2^63` (yielding `i64::MIN`); a
    /// positive one is bounded by `i64::MAX`.
    fn signed_value(magnitude: u64, negative: bool, origin: (usize, usize)) -> Result<i64, LexError> {
        if negative {
            if magnitude > (1u64 << 63) {
                return Err(LexError::new(origin.0, origin.1));
            }
            Ok((magnitude as i64).wrapping_neg())
        } else {
            if magnitude > (i64::MAX as u64) {
                return Err(LexError::new(origin.0, origin.1));
            }
            Ok(magnitude as i64)
        }
    }

    fn scan_unsigned_hex(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let start = self.byte_pos();
        self.expect_0x(origin)?;
        let magnitude = self.scan_hex_digits(origin)?;
        Ok(Token::new(TokenKind::UHex(magnitude), origin.0, origin.1, self.text_since(start)))
    }

    fn scan_signed_hex(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let start = self.byte_pos();
        let negative = self.current() == Some(b'-');
        self.advance();
        self.expect_0x(origin)?;
        let magnitude = self.scan_hex_digits(origin)?;
        let value = Self::signed_value(magnitude, negative, origin)?;
        Ok(Token::new(TokenKind::Hex(value), origin.0, origin.1, self.text_since(start)))
    }

    fn scan_identifier_name(&mut self, origin: (usize, usize)) -> Result<(usize, usize), LexError> {
        let name_start = self.byte_pos();
        while let Some(b) = self.current() {
            if is_ident_cont(b) { self.advance(); } else { break; }
        }
        let mut name_end = self.byte_pos();
        if self.current() == Some(b'.') {
            self.advance();
            match self.current() {
                Some(b) if is_ident_start(b) => {
                    while let Some(c) = self.current() {
                        if is_ident_cont(c) { self.advance(); } else { break; }
                    }
                    name_end = self.byte_pos();
                }
                _ => return Err(LexError::new(origin.0, origin.1)),
            }
        }
        Ok((name_start, name_end))
    }

    fn scan_directive(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let start = self.byte_pos();
        self.advance(); // '.'
        match self.current() {
            Some(b) if is_ident_start(b) => {}
            _ => return Err(LexError::new(origin.0, origin.1)),
        }
        let (name_start, name_end) = self.scan_identifier_name(origin)?;
        let name = String::from_utf8_lossy(&self.input[name_start..name_end]).into_owned();
        Ok(Token::new(TokenKind::Directive(name), origin.0, origin.1, self.text_since(start)))
    }

    fn scan_keyword(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let (name_start, name_end) = self.scan_identifier_name(origin)?;
        let name = String::from_utf8_lossy(&self.input[name_start..name_end]).into_owned();
        Ok(Token::new(TokenKind::Keyword(name), origin.0, origin.1, name))
    }

    fn scan_label(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let start = self.byte_pos();
        self.advance(); // ':'
        match self.current() {
            Some(b) if is_ident_start(b) => {}
            _ => return Err(LexError::new(origin.0, origin.1)),
        }
        let (name_start, name_end) = self.scan_identifier_name(origin)?;
        let name = String::from_utf8_lossy(&self.input[name_start..name_end]).into_owned();

        match self.current() {
            Some(b'+') | Some(b'-') => {
                let negative = self.current() == Some(b'-');
                self.advance();
                self.expect_0x(origin)?;
                let magnitude = self.scan_hex_digits(origin)?;
                let offset = Self::signed_value(magnitude, negative, origin)?;
                Ok(Token::new(TokenKind::LabelOffset(name, offset), origin.0, origin.1, self.text_since(start)))
            }
            _ => Ok(Token::new(TokenKind::Label(name), origin.0, origin.1, self.text_since(start))),
        }
    }

    fn scan_string(&mut self) -> Result<Token, LexError> {
        let origin = self.pos();
        let start = self.byte_pos();
        self.advance(); // opening quote
        let mut raw = Vec::new();
        loop {
            match self.current() {
                None => return Err(LexError::new(origin.0, origin.1)),
                Some(b'"') => { self.advance(); break; }
                Some(b'\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(LexError::new(origin.0, origin.1)),
                        Some(b) => { raw.push(b'\\'); raw.push(b); self.advance(); }
                    }
                }
                Some(b) => { raw.push(b); self.advance(); }
            }
        }
        let decoded = decode_escapes(&raw);
        Ok(Token::new(TokenKind::Str(decoded), origin.0, origin.1, self.text_since(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &[u8]) -> Vec<TokenKind> {
        tokenize(src).expect("tokenize").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert_eq!(kinds(b""), vec![]);
    }

    #[test]
    fn blank_lines_collapse_and_trailing_newlines_are_dropped() {
        assert_eq!(kinds(b"a\n\n\n"), vec![TokenKind::Keyword("a".to_string())]);
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        assert_eq!(kinds(b"a # comment\nb"), vec![
            TokenKind::Keyword("a".to_string()),
            TokenKind::Newline,
            TokenKind::Keyword("b".to_string()),
        ]);
    }

    #[test]
    fn unsigned_hex_literal() {
        assert_eq!(kinds(b"0xFF"), vec![TokenKind::UHex(0xFF)]);
    }

    #[test]
    fn unsigned_hex_max_width() {
        assert_eq!(kinds(b"0xFFFFFFFFFFFFFFFF"), vec![TokenKind::UHex(u64::MAX)]);
    }

    #[test]
    fn unsigned_hex_too_wide_is_a_lex_error() {
        assert!(tokenize(b"0x10000000000000000").is_err());
    }

    #[test]
    fn signed_hex_min() {
        assert_eq!(kinds(b"-0x8000000000000000"), vec![TokenKind::Hex(i64::MIN)]);
    }

    #[test]
    fn signed_hex_below_min_is_a_lex_error() {
        assert!(tokenize(b"-0x8000000000000001").is_err());
    }

    #[test]
    fn signed_hex_above_max_is_a_lex_error() {
        assert!(tokenize(b"+0x8000000000000000").is_err());
    }

    #[test]
    fn directive_token() {
        assert_eq!(kinds(b".section"), vec![TokenKind::Directive("section".to_string())]);
    }

    #[test]
    fn dotted_directive_name() {
        assert_eq!(kinds(b".linking_unit.0"), vec![TokenKind::Directive("linking_unit.0".to_string())]);
    }

    #[test]
    fn label_definition() {
        assert_eq!(kinds(b":loop"), vec![TokenKind::Label("loop".to_string())]);
    }

    #[test]
    fn label_with_offset() {
        assert_eq!(kinds(b":loop+0x10"), vec![TokenKind::LabelOffset("loop".to_string(), 0x10)]);
        assert_eq!(kinds(b":loop-0x10"), vec![TokenKind::LabelOffset("loop".to_string(), -0x10)]);
    }

    #[test]
    fn string_with_escapes() {
        assert_eq!(kinds(b"\"a\\nb\\z\""), vec![TokenKind::Str(b"a\nbz".to_vec())]);
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        assert!(tokenize(b"\"abc").is_err());
    }

    #[test]
    fn leading_bom_is_skipped() {
        let mut src = vec![0xEF, 0xBB, 0xBF];
        src.extend_from_slice(b"a");
        assert_eq!(kinds(&src), vec![TokenKind::Keyword("a".to_string())]);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = tokenize(b"a\nbb").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 1));
    }

    #[test]
    fn unknown_byte_is_a_lex_error() {
        assert!(tokenize(b"@").is_err());
    }
}
