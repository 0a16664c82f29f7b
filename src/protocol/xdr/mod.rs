//! XDR (External Data Representation) serialization per RFC 4506.
//!
//! Every structure that crosses the wire implements the [`Serialize`] and
//! [`Deserialize`] traits. Integers are 4 or 8 byte big endian, booleans are
//! u32 {0,1}, variable-length opaques carry a u32 length prefix and are padded
//! to a 4-byte boundary, enums travel as their u32 discriminant.
//!
//! Decoding fails with `ErrorKind::UnexpectedEof` when the source is
//! truncated or a length prefix promises more bytes than the source holds,
//! and with `ErrorKind::InvalidData` when an enum discriminant falls outside
//! its declared value set. Padding bytes are consumed but not validated.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};

pub mod mount;
pub mod nfs2;
pub mod nfs3;
pub mod portmap;
pub mod rpc;

/// Endianness of everything XDR: big endian, per RFC 4506 section 3.
pub type Endian = BigEndian;

/// Serializes the implementing type into an XDR byte stream.
pub trait Serialize {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

/// Deserializes the implementing type in place from an XDR byte stream.
pub trait Deserialize {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Reads a `T` from the stream starting from its `Default` value.
pub fn deserialize<T: Default + Deserialize>(src: &mut impl Read) -> std::io::Result<T> {
    let mut value = T::default();
    value.deserialize(src)?;
    Ok(value)
}

/// Serializes a value into a fresh buffer. The result length is always a
/// multiple of 4.
pub fn serialize_to_vec<T: Serialize>(value: &T) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.serialize(&mut buf)?;
    Ok(buf)
}

pub(crate) fn invalid_data(m: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m.into())
}

/// Void: procedures without arguments or results.
impl Serialize for () {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

impl Deserialize for () {
    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<Endian>(*self as u32)
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<Endian>()? > 0;
        Ok(())
    }
}

impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<Endian>(*self)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i32::<Endian>()?;
        Ok(())
    }
}

impl Serialize for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i64::<Endian>(*self)
    }
}

impl Deserialize for i64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i64::<Endian>()?;
        Ok(())
    }
}

impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<Endian>(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<Endian>()?;
        Ok(())
    }
}

impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<Endian>(*self)
    }
}

impl Deserialize for u64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u64::<Endian>()?;
        Ok(())
    }
}

/// Fixed-size opaque: raw bytes, no length prefix. Every fixed opaque in the
/// protocols here is already a multiple of 4 bytes, so no padding applies.
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)
    }
}

impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)
    }
}

fn write_padding<W: Write>(len: usize, dest: &mut W) -> std::io::Result<()> {
    const ZEROS: [u8; 4] = [0; 4];
    let pad = (4 - len % 4) % 4;
    if pad > 0 {
        dest.write_all(&ZEROS[..pad])?;
    }
    Ok(())
}

fn read_padding<R: Read>(len: usize, src: &mut R) -> std::io::Result<()> {
    let pad = (4 - len % 4) % 4;
    let mut zeros = [0_u8; 4];
    src.read_exact(&mut zeros[..pad])
}

/// Variable-length opaque: u32 length, bytes, zero padding to a 4-byte
/// boundary. Decoding reads through `Read::take` so a corrupt length prefix
/// cannot force an allocation beyond what the source actually holds.
impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize);
        (self.len() as u32).serialize(dest)?;
        dest.write_all(self)?;
        write_padding(self.len(), dest)
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let mut length: u32 = 0;
        length.deserialize(src)?;
        self.clear();
        let got = src.take(u64::from(length)).read_to_end(self)?;
        if got != length as usize {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("opaque length {length} exceeds remaining buffer"),
            ));
        }
        read_padding(length as usize, src)
    }
}

/// Strings are variable-length opaques whose bytes the wire protocols do not
/// interpret; this impl additionally requires valid UTF-8 on decode.
impl Serialize for String {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        (self.len() as u32).serialize(dest)?;
        dest.write_all(self.as_bytes())?;
        write_padding(self.len(), dest)
    }
}

impl Deserialize for String {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let mut raw: Vec<u8> = Vec::new();
        raw.deserialize(src)?;
        *self = String::from_utf8(raw).map_err(|_| invalid_data("string is not UTF-8"))?;
        Ok(())
    }
}

macro_rules! XDRIntArray {
    ($t:ty) => {
        impl Serialize for Vec<$t> {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                assert!(self.len() < u32::MAX as usize);
                (self.len() as u32).serialize(dest)?;
                for i in self {
                    i.serialize(dest)?;
                }
                Ok(())
            }
        }

        impl Deserialize for Vec<$t> {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                let mut length: u32 = 0;
                length.deserialize(src)?;
                self.clear();
                for _ in 0..length {
                    let mut i: $t = 0;
                    i.deserialize(src)?;
                    self.push(i);
                }
                Ok(())
            }
        }
    };
}

XDRIntArray!(u32);
XDRIntArray!(u64);

/// Implements [`Serialize`] for a struct by walking its fields in declaration
/// order.
#[macro_export]
macro_rules! SerializeStruct {
    ($t:ident, $($field:ident),* $(,)?) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $(self.$field.serialize(dest)?;)*
                Ok(())
            }
        }
    };
}

#[macro_export]
macro_rules! DeserializeStruct {
    ($t:ident, $($field:ident),* $(,)?) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $(self.$field.deserialize(src)?;)*
                Ok(())
            }
        }
    };
}

/// Implements XDR enum transport as the u32 discriminant. The enum must be
/// `Copy`, `#[repr(u32)]` and derive `FromPrimitive`; values outside the
/// declared set fail decoding with `InvalidData`.
#[macro_export]
macro_rules! SerializeEnum {
    ($t:ident) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                (*self as u32).serialize(dest)
            }
        }
    };
}

#[macro_export]
macro_rules! DeserializeEnum {
    ($t:ident) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                let mut raw: u32 = 0;
                raw.deserialize(src)?;
                match FromPrimitive::from_u32(raw) {
                    Some(value) => {
                        *self = value;
                        Ok(())
                    }
                    None => Err($crate::protocol::xdr::invalid_data(format!(
                        "invalid value {} for {}",
                        raw,
                        stringify!($t)
                    ))),
                }
            }
        }
    };
}

/// Implements the XDR union discriminated by a bool: a void arm and a single
/// value-carrying arm.
#[macro_export]
macro_rules! SerializeBoolUnion {
    ($t:ident, $case:ident, $casety:ty) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                match self {
                    $t::Void => false.serialize(dest),
                    $t::$case(v) => {
                        true.serialize(dest)?;
                        v.serialize(dest)
                    }
                }
            }
        }
    };
}

#[macro_export]
macro_rules! DeserializeBoolUnion {
    ($t:ident, $case:ident, $casety:ty) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                let mut present: bool = false;
                present.deserialize(src)?;
                if present {
                    let mut value = <$casety>::default();
                    value.deserialize(src)?;
                    *self = $t::$case(value);
                } else {
                    *self = $t::Void;
                }
                Ok(())
            }
        }
    };
}

pub use crate::DeserializeBoolUnion;
pub use crate::DeserializeEnum;
pub use crate::DeserializeStruct;
pub use crate::SerializeBoolUnion;
pub use crate::SerializeEnum;
pub use crate::SerializeStruct;
