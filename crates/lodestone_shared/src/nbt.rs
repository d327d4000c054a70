use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NbtError;

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;

pub const MAX_DEPTH: usize = 512;

#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(CompoundTag),
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
        }
    }

    pub fn bool(value: bool) -> Self {
        Tag::Byte(i8::from(value))
    }

    pub fn float_list(values: [f32; 3]) -> Self {
        Tag::List(values.into_iter().map(Tag::Float).collect())
    }

    pub fn as_compound(&self) -> Option<&CompoundTag> {
        match self {
            Tag::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Tag::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<CompoundTag> for Tag {
    fn from(compound: CompoundTag) -> Self {
        Tag::Compound(compound)
    }
}

/// An ordered map of named tags. Insertion order is the serialization order,
/// so identical trees always encode to identical bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundTag {
    entries: Vec<(String, Tag)>,
}

impl CompoundTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `tag` under `name`, replacing an existing tag in place so the
    /// original position is kept.
    pub fn set_tag(&mut self, name: impl Into<String>, tag: impl Into<Tag>) -> &mut Self {
        let name = name.into();
        let tag = tag.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = tag,
            None => self.entries.push((name, tag)),
        }
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, tag: impl Into<Tag>) -> Self {
        self.set_tag(name, tag);
        self
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i32) -> &mut Self {
        self.set_tag(name, Tag::Int(value))
    }

    pub fn set_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set_tag(name, Tag::String(value.into()))
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag)
    }

    pub fn get_compound(&self, name: &str) -> Option<&CompoundTag> {
        self.get(name).and_then(Tag::as_compound)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(key, tag)| (key.as_str(), tag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn encode_network(root: &CompoundTag) -> Result<Vec<u8>, NbtError> {
    let mut out = Vec::with_capacity(64);
    out.push(TAG_COMPOUND);
    write_string(&mut out, "");
    write_compound(&mut out, root)?;
    Ok(out)
}

pub fn decode_network(data: &[u8]) -> Result<CompoundTag, NbtError> {
    let mut reader = Reader { data, pos: 0 };
    let root_type = reader.u8()?;
    if root_type != TAG_COMPOUND {
        return Err(NbtError::RootNotCompound(root_type));
    }
    let _name = reader.string()?;
    let root = reader.compound(0)?;
    let remaining = data.len() - reader.pos;
    if remaining != 0 {
        return Err(NbtError::TrailingBytes(remaining));
    }
    Ok(root)
}

fn write_compound(out: &mut Vec<u8>, compound: &CompoundTag) -> Result<(), NbtError> {
    for (name, tag) in &compound.entries {
        out.push(tag.type_id());
        write_string(out, name);
        write_payload(out, name, tag)?;
    }
    out.push(TAG_END);
    Ok(())
}

fn write_payload(out: &mut Vec<u8>, name: &str, tag: &Tag) -> Result<(), NbtError> {
    match tag {
        Tag::Byte(value) => out.push(*value as u8),
        Tag::Short(value) => out.extend_from_slice(&value.to_le_bytes()),
        Tag::Int(value) => write_var_u32(out, zigzag32(*value)),
        Tag::Long(value) => write_var_u64(out, zigzag64(*value)),
        Tag::Float(value) => out.extend_from_slice(&value.to_le_bytes()),
        Tag::Double(value) => out.extend_from_slice(&value.to_le_bytes()),
        Tag::String(value) => write_string(out, value),
        Tag::List(items) => {
            let element_type = items.first().map_or(TAG_END, Tag::type_id);
            if items.iter().any(|item| item.type_id() != element_type) {
                return Err(NbtError::MixedList(name.to_string()));
            }
            out.push(element_type);
            write_var_u32(out, zigzag32(items.len() as i32));
            for item in items {
                write_payload(out, name, item)?;
            }
        }
        Tag::Compound(compound) => write_compound(out, compound)?,
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_var_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn write_var_u32(out: &mut Vec<u8>, value: u32) {
    write_var_u64(out, u64::from(value));
}

fn write_var_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], NbtError> {
        let end = self.pos.checked_add(len).ok_or(NbtError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(NbtError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], NbtError> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N)?);
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, NbtError> {
        Ok(self.take(1)?[0])
    }

    fn var_u64(&mut self, max_bytes: usize) -> Result<u64, NbtError> {
        let mut value = 0u64;
        for index in 0..max_bytes {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7f) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(NbtError::VarIntTooLong(max_bytes))
    }

    fn var_u32(&mut self) -> Result<u32, NbtError> {
        Ok(self.var_u64(5)? as u32)
    }

    fn length(&mut self) -> Result<usize, NbtError> {
        let len = unzigzag32(self.var_u32()?);
        usize::try_from(len).map_err(|_| NbtError::NegativeLength(len))
    }

    fn string(&mut self) -> Result<String, NbtError> {
        let len = self.var_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NbtError::InvalidUtf8)
    }

    fn compound(&mut self, depth: usize) -> Result<CompoundTag, NbtError> {
        if depth >= MAX_DEPTH {
            return Err(NbtError::TooDeep(MAX_DEPTH));
        }
        let mut compound = CompoundTag::new();
        loop {
            let tag_type = self.u8()?;
            if tag_type == TAG_END {
                return Ok(compound);
            }
            let name = self.string()?;
            let tag = self.payload(tag_type, depth + 1)?;
            compound.entries.push((name, tag));
        }
    }

    fn payload(&mut self, tag_type: u8, depth: usize) -> Result<Tag, NbtError> {
        if depth >= MAX_DEPTH {
            return Err(NbtError::TooDeep(MAX_DEPTH));
        }
        let tag = match tag_type {
            TAG_BYTE => Tag::Byte(self.u8()? as i8),
            TAG_SHORT => Tag::Short(i16::from_le_bytes(self.array()?)),
            TAG_INT => Tag::Int(unzigzag32(self.var_u32()?)),
            TAG_LONG => Tag::Long(unzigzag64(self.var_u64(10)?)),
            TAG_FLOAT => Tag::Float(f32::from_le_bytes(self.array()?)),
            TAG_DOUBLE => Tag::Double(f64::from_le_bytes(self.array()?)),
            TAG_STRING => Tag::String(self.string()?),
            TAG_LIST => {
                let element_type = self.u8()?;
                let len = self.length()?;
                if element_type == TAG_END && len > 0 {
                    return Err(NbtError::UnknownTagType(TAG_END));
                }
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.payload(element_type, depth + 1)?);
                }
                Tag::List(items)
            }
            TAG_COMPOUND => Tag::Compound(self.compound(depth)?),
            other => return Err(NbtError::UnknownTagType(other)),
        };
        Ok(tag)
    }
}

/// Serde adapter carrying a compound as its network NBT bytes.
pub mod network_bytes {
    use super::*;

    pub fn serialize<S>(tree: &CompoundTag, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = encode_network(tree).map_err(serde::ser::Error::custom)?;
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<CompoundTag, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        decode_network(&bytes).map_err(de::Error::custom)
    }
}
