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

/// A simple alias to make things a bit clearer.  In essence, this
/// generates an encoding error from a given byte or word in the
/// stream (depending on the kind of error being generated).
type EncodingErrorFn<T,E> = fn(T)->E;

/// A utility for encoding structured data into bytes.  All multi-byte
/// values are written little-endian, matching the on-disk executable
/// format.
pub struct ByteEncoder {
    bytes: Vec<u8>
}

impl ByteEncoder {
    pub const fn new() -> Self {
        Self{bytes: Vec::new()}
    }

    /// Encode a single byte into this stream.
    pub fn encode_u8(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Encode a 16bit word into this stream using a little endian
    /// representation.
    pub fn encode_u16(&mut self, word: u16) {
        self.bytes.extend(word.to_le_bytes())
    }

    /// Encode a 32bit word into this stream using a little endian
    /// representation.
    pub fn encode_u32(&mut self, word: u32) {
        self.bytes.extend(word.to_le_bytes())
    }

    /// Encode a 64bit word into this stream using a little endian
    /// representation.
    pub fn encode_u64(&mut self, word: u64) {
        self.bytes.extend(word.to_le_bytes())
    }

    pub fn encode_checked_u32<E>(&mut self, word: usize, ef: EncodingErrorFn<usize,E>) -> Result<(),E> {
        if word > (u32::MAX as usize) {
            Err(ef(word))
        } else {
            self.encode_u32(word as u32);
            Ok(())
        }
    }

    /// Append `n` zero bytes (used for fixed-size padding fields).
    pub fn encode_zeros(&mut self, n: usize) {
        self.bytes.resize(self.bytes.len() + n, 0);
    }

    /// Append a raw byte slice verbatim.
    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append a fixed-width, NUL-padded tag (e.g. a section or unit
    /// type name). Panics if `name` does not fit in `width` bytes,
    /// which would indicate a programming error rather than bad
    /// input.
    pub fn encode_tag(&mut self, name: &str, width: usize) {
        assert!(name.len() < width, "tag '{name}' does not fit in {width} bytes");
        self.encode_bytes(name.as_bytes());
        self.encode_zeros(width - name.len());
    }

    /// Current length of the encoded stream.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.bytes
    }
}
