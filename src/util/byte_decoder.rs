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
/// generates a decoding error from a given byte or word in the stream
/// (depending on the kind of error being generated).
type DecodingErrorFn<T,E> = fn(T)->E;

/// Utility for pulling structured data back out of a byte stream.
/// Used by tests (and by tooling built atop this crate) to verify the
/// binary executable image the linker produces. All multi-byte values
/// are read little-endian, matching the on-disk executable format.
pub struct ByteDecoder<'a> {
    bytes: &'a [u8],
    index: usize
}

impl<'a> ByteDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self{bytes,index:0}
    }

    pub fn position(&self) -> usize {
        self.index
    }

    /// Attempt to match a given `u8` byte in the bytestream at the
    /// present position.  If the match fails, an error is generating
    /// using the provided decoding error generator.
    pub fn match_u8<E:Default>(&mut self, n: u8, ef: DecodingErrorFn<u8,E>) -> Result<(),E> {
        let m = self.decode_u8()?;
        if m == n { Ok(()) }
        else { Err(ef(m)) }
    }

    /// Attempt to match a fixed-width NUL-padded tag at the present
    /// position, advancing past it on success.
    pub fn match_tag<E:Default>(&mut self, tag: &str, width: usize, ef: DecodingErrorFn<Vec<u8>,E>) -> Result<(),E> {
        let bytes = self.decode_bytes::<E>(width)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        if &bytes[..end] == tag.as_bytes() {
            Ok(())
        } else {
            Err(ef(bytes.to_vec()))
        }
    }

    /// Read the next byte from the sequence, and move our position to
    /// the next byte in the sequence.  If no such byte is available
    /// (i.e. we have reached the end of the byte sequence), then an
    /// error is reported.
    pub fn decode_u8<E:Default>(&mut self) -> Result<u8,E> {
        if self.index < self.bytes.len() {
            let next = self.bytes[self.index];
            self.index += 1;
            Ok(next)
        } else {
            Err(E::default())
        }
    }

    /// Read the next word from the sequence assuming a _little endian_
    /// representation, whilst moving our position to the next byte in
    /// the sequence.  If no such word is available (i.e. we have
    /// reached the end of the byte sequence), then an error is
    /// reported.
    pub fn decode_u16<E:Default>(&mut self) -> Result<u16,E> {
        let bytes = self.decode_bytes::<E>(2)?;
        Ok(u16::from_le_bytes([bytes[0],bytes[1]]))
    }

    pub fn decode_u32<E:Default>(&mut self) -> Result<u32,E> {
        let bytes = self.decode_bytes::<E>(4)?;
        Ok(u32::from_le_bytes([bytes[0],bytes[1],bytes[2],bytes[3]]))
    }

    pub fn decode_u64<E:Default>(&mut self) -> Result<u64,E> {
        let bytes = self.decode_bytes::<E>(8)?;
        let mut buf = [0u8;8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read the next `n` bytes from the sequence, whilst moving our
    /// position to the following byte.  If there are insufficient
    /// bytes remaining, then an error is reported.
    pub fn decode_bytes<E:Default>(&mut self, length: usize) -> Result<&'a [u8],E> {
        let start = self.index;
        self.index += length;
        if self.index <= self.bytes.len() {
            Ok(&self.bytes[start..self.index])
        } else {
            Err(E::default())
        }
    }
}
