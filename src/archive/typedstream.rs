//! Typed stream (`NSArchiver`) decoder.
//!
//! A typed stream is a header followed by groups of typed values. Each group
//! starts with a type encoding string (`"@"`, `"iI"`, `"+"`, ...) and is
//! followed by one value per encoded type. Objects carry their class chain and
//! then nested groups up to an end-of-object tag. Type encodings, class names
//! and objects can be written once and referenced later by number.
//!
//! Only what is needed to pull primitive values out of a message body is
//! modeled: classes are tracked for reference numbering but not emitted, and
//! object references come out as [`ArchiveValue::Uid`].

use super::{ArchiveError, ArchiveResult, ArchiveValue};

const TAG_INTEGER_2: u8 = 0x81;
const TAG_INTEGER_4: u8 = 0x82;
const TAG_FLOATING_POINT: u8 = 0x83;
const TAG_NEW: u8 = 0x84;
const TAG_NIL: u8 = 0x85;
const TAG_END_OF_OBJECT: u8 = 0x86;

/// Tags occupy 0x80..=0x91; anything above is a literal or a reference.
const FIRST_TAG: u8 = 0x80;
const LAST_TAG: u8 = 0x91;

/// Reference numbers are stored offset by this value (0x92 as a signed byte).
const FIRST_REFERENCE_NUMBER: i64 = -110;

const SIGNATURE_LITTLE_ENDIAN: &[u8] = b"streamtyped";
const SIGNATURE_BIG_ENDIAN: &[u8] = b"typedstream";

const MAX_DEPTH: usize = 256;

/// Decode a typed stream into the primitive values it contains, in stream order.
pub fn decode(bytes: &[u8]) -> ArchiveResult<Vec<ArchiveValue>> {
    let mut reader = Reader::new(bytes);
    reader.read_header()?;

    while !reader.at_end() {
        reader.read_group(0)?;
    }

    Ok(reader.values)
}

/// Decode a typed stream and return its first byte string as UTF-8 text.
///
/// This is the plain text of a rich-text (`attributedBody`) message.
pub fn decode_text(bytes: &[u8]) -> ArchiveResult<String> {
    let values = decode(bytes)?;
    let first = values
        .iter()
        .find_map(ArchiveValue::as_data)
        .ok_or(ArchiveError::MissingByteString)?;

    Ok(String::from_utf8(first.to_vec())?)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
    shared_strings: Vec<Vec<u8>>,
    shared_objects: usize,
    values: Vec<ArchiveValue>,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            big_endian: false,
            shared_strings: Vec::new(),
            shared_objects: 0,
            values: Vec::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_byte(&mut self) -> ArchiveResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(ArchiveError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn peek_byte(&self) -> ArchiveResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(ArchiveError::UnexpectedEof { offset: self.pos })
    }

    fn read_exact(&mut self, len: usize) -> ArchiveResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ArchiveError::UnexpectedEof { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> ArchiveResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    fn unexpected(&self, tag: u8) -> ArchiveError {
        ArchiveError::UnexpectedTag {
            tag,
            offset: self.pos.saturating_sub(1),
        }
    }

    fn read_header(&mut self) -> ArchiveResult<()> {
        let head = self.read_byte()?;
        let version = self.read_integer(head)?;
        if !(3..=4).contains(&version) {
            return Err(ArchiveError::BadHeader(format!(
                "unsupported streamer version {}",
                version
            )));
        }

        let head = self.read_byte()?;
        let signature = self
            .read_unshared_string(head)?
            .ok_or_else(|| ArchiveError::BadHeader("missing signature".to_string()))?;
        self.big_endian = match signature {
            SIGNATURE_LITTLE_ENDIAN => false,
            SIGNATURE_BIG_ENDIAN => true,
            other => {
                return Err(ArchiveError::BadHeader(format!(
                    "unknown signature {:?}",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        // System version, not needed for decoding
        let head = self.read_byte()?;
        self.read_integer(head)?;

        Ok(())
    }

    /// Read an integer whose first byte has already been consumed.
    fn read_integer(&mut self, head: u8) -> ArchiveResult<i64> {
        match head {
            TAG_INTEGER_2 => {
                let bytes = self.read_array::<2>()?;
                let value = if self.big_endian {
                    i16::from_be_bytes(bytes)
                } else {
                    i16::from_le_bytes(bytes)
                };
                Ok(value as i64)
            }
            TAG_INTEGER_4 => {
                let bytes = self.read_array::<4>()?;
                let value = if self.big_endian {
                    i32::from_be_bytes(bytes)
                } else {
                    i32::from_le_bytes(bytes)
                };
                Ok(value as i64)
            }
            FIRST_TAG..=LAST_TAG => Err(self.unexpected(head)),
            literal => Ok(literal as i8 as i64),
        }
    }

    /// Floats without the floating point tag were written as integers.
    fn read_float(&mut self, head: u8) -> ArchiveResult<f64> {
        if head != TAG_FLOATING_POINT {
            return Ok(self.read_integer(head)? as f64);
        }
        let bytes = self.read_array::<4>()?;
        let value = if self.big_endian {
            f32::from_be_bytes(bytes)
        } else {
            f32::from_le_bytes(bytes)
        };
        Ok(value as f64)
    }

    fn read_double(&mut self, head: u8) -> ArchiveResult<f64> {
        if head != TAG_FLOATING_POINT {
            return Ok(self.read_integer(head)? as f64);
        }
        let bytes = self.read_array::<8>()?;
        let value = if self.big_endian {
            f64::from_be_bytes(bytes)
        } else {
            f64::from_le_bytes(bytes)
        };
        Ok(value)
    }

    fn read_unshared_string(&mut self, head: u8) -> ArchiveResult<Option<&'a [u8]>> {
        if head == TAG_NIL {
            return Ok(None);
        }
        let len = self.read_integer(head)?;
        let len = usize::try_from(len).map_err(|_| self.unexpected(head))?;
        self.read_exact(len).map(Some)
    }

    fn read_shared_string(&mut self) -> ArchiveResult<Option<Vec<u8>>> {
        let head = self.read_byte()?;
        match head {
            TAG_NIL => Ok(None),
            TAG_NEW => {
                let head = self.read_byte()?;
                let string = match self.read_unshared_string(head)? {
                    Some(bytes) => bytes.to_vec(),
                    None => return Err(self.unexpected(head)),
                };
                self.shared_strings.push(string.clone());
                Ok(Some(string))
            }
            _ => {
                let index = self.read_reference(head)?;
                match self.shared_strings.get(index) {
                    Some(string) => Ok(Some(string.clone())),
                    None => Err(ArchiveError::InvalidReference {
                        table: "string",
                        index: index as i64,
                    }),
                }
            }
        }
    }

    fn read_reference(&mut self, head: u8) -> ArchiveResult<usize> {
        let number = self.read_integer(head)? - FIRST_REFERENCE_NUMBER;
        usize::try_from(number).map_err(|_| ArchiveError::InvalidReference {
            table: "shared",
            index: number,
        })
    }

    fn read_object_reference(&mut self, head: u8) -> ArchiveResult<usize> {
        let index = self.read_reference(head)?;
        if index >= self.shared_objects {
            return Err(ArchiveError::InvalidReference {
                table: "object",
                index: index as i64,
            });
        }
        Ok(index)
    }

    fn check_depth(depth: usize) -> ArchiveResult<()> {
        if depth > MAX_DEPTH {
            return Err(ArchiveError::UnsupportedEncoding(format!(
                "nesting deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    fn read_group(&mut self, depth: usize) -> ArchiveResult<()> {
        Self::check_depth(depth)?;

        let encoding = self
            .read_shared_string()?
            .ok_or(ArchiveError::UnsupportedEncoding("nil".to_string()))?;

        for ty in split_encodings(&encoding)? {
            let value = self.read_value(ty, depth)?;
            if let Some(value) = value {
                self.values.push(value);
            }
        }
        Ok(())
    }

    /// Read one value of the given type encoding.
    ///
    /// Objects push their own nested values and return `None` unless they are
    /// nil or a back-reference.
    fn read_value(&mut self, ty: &[u8], depth: usize) -> ArchiveResult<Option<ArchiveValue>> {
        match ty.first() {
            Some(b'[') => return self.read_c_array(ty, depth).map(Some),
            Some(b'{') => return self.read_struct(ty, depth).map(Some),
            _ => {}
        }

        let head = self.read_byte()?;
        let value = match ty {
            b"@" => return self.read_object(head, depth),
            b"#" => {
                self.read_class(head)?;
                return Ok(None);
            }
            b"+" => match self.read_unshared_string(head)? {
                Some(bytes) => ArchiveValue::Data(bytes.to_vec()),
                None => ArchiveValue::Null,
            },
            b"*" | b"%" | b":" => {
                // Shared strings carry their own head byte
                self.pos -= 1;
                match self.read_shared_string()? {
                    Some(bytes) => {
                        ArchiveValue::String(String::from_utf8_lossy(&bytes).into_owned())
                    }
                    None => ArchiveValue::Null,
                }
            }
            b"B" => ArchiveValue::Boolean(self.read_integer(head)? != 0),
            b"c" | b"s" | b"i" | b"l" | b"q" => ArchiveValue::Integer(self.read_integer(head)?),
            b"C" => ArchiveValue::Integer(self.read_integer(head)? as u8 as i64),
            b"S" => ArchiveValue::Integer(self.read_integer(head)? as u16 as i64),
            b"I" | b"L" => ArchiveValue::Integer(self.read_integer(head)? as u32 as i64),
            b"Q" => ArchiveValue::Integer(self.read_integer(head)?),
            b"f" => ArchiveValue::Real(self.read_float(head)?),
            b"d" => ArchiveValue::Real(self.read_double(head)?),
            other => {
                return Err(ArchiveError::UnsupportedEncoding(
                    String::from_utf8_lossy(other).into_owned(),
                ))
            }
        };
        Ok(Some(value))
    }

    fn read_object(&mut self, head: u8, depth: usize) -> ArchiveResult<Option<ArchiveValue>> {
        match head {
            TAG_NIL => Ok(Some(ArchiveValue::Null)),
            TAG_NEW => {
                self.shared_objects += 1;
                let class_head = self.read_byte()?;
                self.read_class(class_head)?;

                loop {
                    if self.peek_byte()? == TAG_END_OF_OBJECT {
                        self.pos += 1;
                        break;
                    }
                    self.read_group(depth + 1)?;
                }
                Ok(None)
            }
            _ => {
                let index = self.read_object_reference(head)?;
                Ok(Some(ArchiveValue::Uid(index as u64)))
            }
        }
    }

    /// Walk a class chain up to its root (nil) or a previously seen class.
    fn read_class(&mut self, head: u8) -> ArchiveResult<()> {
        let mut head = head;
        loop {
            match head {
                TAG_NIL => return Ok(()),
                TAG_NEW => {
                    if self.read_shared_string()?.is_none() {
                        return Err(ArchiveError::UnsupportedEncoding("unnamed class".into()));
                    }
                    let version_head = self.read_byte()?;
                    self.read_integer(version_head)?;
                    self.shared_objects += 1;
                    head = self.read_byte()?;
                }
                _ => {
                    self.read_object_reference(head)?;
                    return Ok(());
                }
            }
        }
    }

    /// Read a C array such as `[12c]` or `[4i]`.
    ///
    /// Every element occupies at least one byte, so a count larger than the
    /// remaining input or an element that consumes nothing is malformed.
    fn read_c_array(&mut self, ty: &[u8], depth: usize) -> ArchiveResult<ArchiveValue> {
        Self::check_depth(depth)?;
        let inner = &ty[1..ty.len() - 1];
        let digits = inner.iter().take_while(|b| b.is_ascii_digit()).count();
        let count: usize = std::str::from_utf8(&inner[..digits])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                ArchiveError::UnsupportedEncoding(String::from_utf8_lossy(ty).into_owned())
            })?;
        let element = &inner[digits..];

        // Character arrays are stored as raw bytes
        if element == b"c" || element == b"C" {
            return Ok(ArchiveValue::Data(self.read_exact(count)?.to_vec()));
        }

        if count > self.data.len() - self.pos {
            return Err(ArchiveError::UnexpectedEof {
                offset: self.data.len(),
            });
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let start = self.pos;
            if let Some(v) = self.read_value(element, depth + 1)? {
                items.push(v);
            }
            if self.pos == start {
                return Err(ArchiveError::UnsupportedEncoding(
                    String::from_utf8_lossy(ty).into_owned(),
                ));
            }
        }
        Ok(ArchiveValue::Array(items))
    }

    fn read_struct(&mut self, ty: &[u8], depth: usize) -> ArchiveResult<ArchiveValue> {
        Self::check_depth(depth)?;
        let inner = &ty[1..ty.len() - 1];
        let fields = match inner.iter().position(|b| *b == b'=') {
            Some(eq) => &inner[eq + 1..],
            None => inner,
        };
        if fields.is_empty() {
            return Err(ArchiveError::UnsupportedEncoding(String::from_utf8_lossy(ty).into_owned()));
        }

        let mut items = Vec::new();
        for field in split_encodings(fields)? {
            if let Some(v) = self.read_value(field, depth + 1)? {
                items.push(v);
            }
        }
        Ok(ArchiveValue::Array(items))
    }
}

/// Split a type encoding string into the encodings of its individual values.
fn split_encodings(encoding: &[u8]) -> ArchiveResult<Vec<&[u8]>> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < encoding.len() {
        let start = i;
        match encoding[i] {
            open @ (b'{' | b'[' | b'(') => {
                let mut depth = 0usize;
                loop {
                    let byte = *encoding.get(i).ok_or_else(|| {
                        ArchiveError::UnsupportedEncoding(
                            String::from_utf8_lossy(encoding).into_owned(),
                        )
                    })?;
                    match byte {
                        b'{' | b'[' | b'(' => depth += 1,
                        b'}' | b']' | b')' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                    if depth == 0 {
                        break;
                    }
                }
                if open == b'(' {
                    return Err(ArchiveError::UnsupportedEncoding(
                        String::from_utf8_lossy(&encoding[start..i]).into_owned(),
                    ));
                }
            }
            _ => i += 1,
        }
        out.push(&encoding[start..i]);
    }

    Ok(out)
}
