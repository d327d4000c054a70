use std::fmt;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::nbt::{CompoundTag, Tag};

pub const MAX_STATE_BITS: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    String(String),
}

impl PropertyValue {
    fn to_tag(&self) -> Tag {
        match self {
            PropertyValue::Bool(value) => Tag::bool(*value),
            PropertyValue::Int(value) => Tag::Int(*value),
            PropertyValue::String(value) => Tag::String(value.clone()),
        }
    }
}

/// Renders the value the way it appears in a molang condition.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::Int(value) => write!(f, "{value}"),
            PropertyValue::String(value) => write!(f, "'{value}'"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProperty {
    pub name: String,
    pub values: Vec<PropertyValue>,
}

impl BlockProperty {
    pub fn new(name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, vec![false.into(), true.into()])
    }

    /// Bits needed to store an index into the domain.
    pub fn bits(&self) -> usize {
        match self.values.len() {
            0 | 1 => 0,
            len => (usize::BITS - (len - 1).leading_zeros()) as usize,
        }
    }

    pub fn index_of(&self, value: &PropertyValue) -> Option<usize> {
        self.values.iter().position(|candidate| candidate == value)
    }

    /// Molang condition matching this property against `value`.
    pub fn condition(&self, value: &PropertyValue) -> String {
        format!("q.block_property('{}') == {value}", self.name)
    }

    pub fn to_tag(&self) -> CompoundTag {
        CompoundTag::new()
            .with_tag("name", Tag::String(self.name.clone()))
            .with_tag(
                "enum",
                Tag::List(self.values.iter().map(PropertyValue::to_tag).collect()),
            )
    }
}

/// Component overrides the client applies while `condition` holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Permutation {
    condition: String,
    components: CompoundTag,
}

impl Permutation {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            components: CompoundTag::new(),
        }
    }

    pub fn with_component(mut self, name: impl Into<String>, component: CompoundTag) -> Self {
        self.components.set_tag(name, component);
        self
    }

    pub fn add_component(&mut self, name: impl Into<String>, component: CompoundTag) {
        self.components.set_tag(name, component);
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn components(&self) -> &CompoundTag {
        &self.components
    }

    pub fn to_tag(&self) -> CompoundTag {
        CompoundTag::new()
            .with_tag("condition", Tag::String(self.condition.clone()))
            .with_tag("components", self.components.clone())
    }
}

/// Bit-packed property indices, in declaration order, least significant bit first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeState {
    bits: BitVec<u32, Lsb0>,
}

impl RuntimeState {
    pub fn from_raw(raw: u32, width: usize) -> Self {
        let width = width.min(MAX_STATE_BITS);
        let mut bits = BitVec::<u32, Lsb0>::from_element(raw);
        bits.truncate(width);
        Self { bits }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn raw(&self) -> u32 {
        if self.bits.is_empty() {
            0
        } else {
            self.bits.load_le::<u32>()
        }
    }
}

/// Declared properties of one block type and the bit layout they imply.
///
/// Property order fixes the layout: reordering or resizing a domain changes
/// the meaning of every stored state and is a breaking format change.
#[derive(Clone, Debug, PartialEq)]
pub struct StateEncoder {
    properties: Vec<BlockProperty>,
    width: usize,
}

impl StateEncoder {
    pub fn new(properties: Vec<BlockProperty>) -> Result<Self, EncodingError> {
        for (index, property) in properties.iter().enumerate() {
            if property.values.is_empty() {
                return Err(EncodingError::EmptyDomain(property.name.clone()));
            }
            if properties[..index]
                .iter()
                .any(|earlier| earlier.name == property.name)
            {
                return Err(EncodingError::DuplicateProperty(property.name.clone()));
            }
        }

        let width = properties.iter().map(BlockProperty::bits).sum();
        if width > MAX_STATE_BITS {
            return Err(EncodingError::TooWide(width));
        }

        Ok(Self { properties, width })
    }

    /// A lone on/off property, one bit wide.
    pub fn single_boolean(name: impl Into<String>) -> Self {
        Self {
            properties: vec![BlockProperty::boolean(name)],
            width: 1,
        }
    }

    pub fn declare_properties(&self) -> &[BlockProperty] {
        &self.properties
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encode(&self, values: &[PropertyValue]) -> Result<RuntimeState, EncodingError> {
        if values.len() != self.properties.len() {
            return Err(EncodingError::Arity {
                expected: self.properties.len(),
                found: values.len(),
            });
        }

        let mut bits = bitvec![u32, Lsb0; 0; self.width];
        let mut offset = 0;
        for (property, value) in self.properties.iter().zip(values) {
            let index = property
                .index_of(value)
                .ok_or_else(|| EncodingError::UnknownValue {
                    property: property.name.clone(),
                    value: value.to_string(),
                })?;
            let width = property.bits();
            if width > 0 {
                bits[offset..offset + width].store_le(index as u32);
            }
            offset += width;
        }

        Ok(RuntimeState { bits })
    }

    pub fn decode(&self, state: &RuntimeState) -> Result<Vec<PropertyValue>, EncodingError> {
        if state.width() != self.width {
            return Err(EncodingError::WidthMismatch {
                expected: self.width,
                found: state.width(),
            });
        }

        let mut values = Vec::with_capacity(self.properties.len());
        let mut offset = 0;
        for property in &self.properties {
            let width = property.bits();
            let index = if width > 0 {
                state.bits[offset..offset + width].load_le::<u32>()
            } else {
                0
            };
            let value = property.values.get(index as usize).ok_or_else(|| {
                EncodingError::IndexOutOfDomain {
                    property: property.name.clone(),
                    index,
                }
            })?;
            values.push(value.clone());
            offset += width;
        }

        Ok(values)
    }

    pub fn properties_tag(&self) -> Tag {
        Tag::List(
            self.properties
                .iter()
                .map(|property| Tag::Compound(property.to_tag()))
                .collect(),
        )
    }
}
