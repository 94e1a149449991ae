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

//! Structured diagnostics shared by the lexer, assembler and linker.
//!
//! None of these types render a message: per `spec.md` §4.G / §7, that
//! is the CLI collaborator's job, done with the token and source
//! buffer in hand.
use std::fmt;
use crate::token::Token;

/// Failure of the lexer. Carries only the position at which
/// tokenization became impossible, per `spec.md` §4.C.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct LexError {
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lex error at line {}, column {}", self.line, self.column)
    }
}

impl std::error::Error for LexError {}

/// The taxonomy of failures the assembler can return, per `spec.md`
/// §4.E / §7.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum AssembleErrorKind {
    OutOfMemory,
    UnexpectedToken,
    UnexpectedEof,
    DuplicateLabel,
    UnknownDirective,
    UnknownInstruction,
    InvalidNumberOfParameters,
    InvalidParameter,
    UndefinedLabel,
    InvalidLabel,
    InvalidLabelOffset,
}

/// A structured assembler failure: a kind, optionally the offending
/// token, and optionally a decoded detail string (e.g. the unknown
/// mnemonic).
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct AssembleError {
    pub kind: AssembleErrorKind,
    pub token: Option<Token>,
    pub detail: Option<String>,
}

impl AssembleError {
    pub fn new(kind: AssembleErrorKind) -> Self {
        Self { kind, token: None, detail: None }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(d) = &self.detail {
            write!(f, " ({d})")?;
        }
        if let Some(t) = &self.token {
            write!(f, " at line {}, column {}", t.line, t.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssembleError {}

/// Failures from the linker / file emitter, per `spec.md` §4.F / §7.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum LinkError {
    /// The requested file-format version is not implemented.
    UnsupportedVersion(u16),
    /// Some dimension of the executable (unit count, a section
    /// length, code block count) overflowed its on-disk field width.
    /// Carries which dimension, for diagnostics.
    ExecutableTooLarge(&'static str),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkError::UnsupportedVersion(v) => write!(f, "unsupported executable format version {v}"),
            LinkError::ExecutableTooLarge(dim) => write!(f, "executable too large: {dim} overflowed"),
        }
    }
}

impl std::error::Error for LinkError {}
