use glam::Vec3;
use thiserror::Error;

/// A collision or selection box that does not fit inside the block cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{field} {value} lies outside the block bounds (-8, 0, -8)..=(8, 16, 8)")]
    OutOfRange { field: &'static str, value: Vec3 },
    #[error("{field} {size} extends past (8, 16, 8) from origin {origin}")]
    Overflow {
        field: &'static str,
        origin: Vec3,
        size: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("value {value} is not in the domain of block property '{property}'")]
    UnknownValue { property: String, value: String },
    #[error("state index {index} is outside the domain of block property '{property}'")]
    IndexOutOfDomain { property: String, index: u32 },
    #[error("expected {expected} property values, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("runtime state is {found} bits wide; this block declares {expected}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("block property '{0}' declares an empty domain")]
    EmptyDomain(String),
    #[error("block property '{0}' is declared twice")]
    DuplicateProperty(String),
    #[error("declared properties need {0} state bits; at most 32 are available")]
    TooWide(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NbtError {
    #[error("unexpected end of nbt payload")]
    UnexpectedEof,
    #[error("unknown nbt tag type {0}")]
    UnknownTagType(u8),
    #[error("list '{0}' mixes tag types")]
    MixedList(String),
    #[error("nbt string is not valid utf-8")]
    InvalidUtf8,
    #[error("root tag must be a compound, found type {0}")]
    RootNotCompound(u8),
    #[error("{0} trailing bytes after the root compound")]
    TrailingBytes(usize),
    #[error("nbt nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("varint is longer than {0} bytes")]
    VarIntTooLong(usize),
    #[error("negative length {0}")]
    NegativeLength(i32),
}

/// A property tree is missing something the client requires.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("entry '{identifier}' is missing required key '{key}'")]
    MissingKey { identifier: String, key: &'static str },
    #[error("entry '{identifier}' key '{key}' has the wrong tag type")]
    WrongType { identifier: String, key: &'static str },
    #[error("entry '{identifier}' names itself '{found}'")]
    NameMismatch { identifier: String, found: String },
    #[error("entry '{identifier}' carries id {found}, registered as {expected}")]
    IdMismatch {
        identifier: String,
        expected: i32,
        found: i32,
    },
    #[error("entry '{identifier}' cannot be encoded: {source}")]
    Unencodable {
        identifier: String,
        #[source]
        source: NbtError,
    },
}
