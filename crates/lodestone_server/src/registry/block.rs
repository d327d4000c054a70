use std::sync::{Arc, PoisonError, RwLock};

use lodestone_shared::nbt::{CompoundTag, Tag};
use lodestone_shared::permutation::StateEncoder;
use lodestone_shared::protocol::{TypeEntry, ITEM_VERSION_DATA_DRIVEN};
use lodestone_shared::schema::{validate, EntryLayout};
use rustc_hash::FxHashMap;
use tracing::info;

use super::{ItemRegistry, RegistryError};
use crate::descriptor::CustomBlock;

/// Molang revision the permutation conditions are written against.
pub const MOLANG_VERSION: i32 = 12;

struct PaletteEntry {
    wire: TypeEntry,
    block: Arc<dyn CustomBlock>,
}

#[derive(Default)]
struct Palette {
    entries: Vec<PaletteEntry>,
    by_identifier: FxHashMap<String, usize>,
}

/// Custom block types and the palette sent at world start. Every block also
/// gets an item form in the shared [`ItemRegistry`].
pub struct BlockRegistry {
    items: Arc<ItemRegistry>,
    palette: RwLock<Palette>,
}

impl BlockRegistry {
    pub fn new(items: Arc<ItemRegistry>) -> Self {
        Self {
            items,
            palette: RwLock::new(Palette::default()),
        }
    }

    pub fn register_block(
        &self,
        identifier: &str,
        block: Arc<dyn CustomBlock>,
    ) -> Result<i32, RegistryError> {
        let wire = palette_entry(identifier, block.as_ref())?;

        let mut palette = self.palette.write().unwrap_or_else(PoisonError::into_inner);
        if palette.by_identifier.contains_key(identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier.to_string()));
        }
        let numeric_id = self
            .items
            .register_block_item(identifier, Arc::clone(&block))?;

        let index = palette.entries.len();
        palette.by_identifier.insert(identifier.to_string(), index);
        palette.entries.push(PaletteEntry { wire, block });
        info!("registered block {identifier} as {numeric_id}");
        Ok(numeric_id)
    }

    /// Palette entries in registration order.
    pub fn palette_entries(&self) -> Vec<TypeEntry> {
        self.palette
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|entry| entry.wire.clone())
            .collect()
    }

    /// Rebuilds one palette entry from its block, keeping its position.
    pub fn regenerate(&self, identifier: &str) -> Result<TypeEntry, RegistryError> {
        let mut palette = self.palette.write().unwrap_or_else(PoisonError::into_inner);
        let index = *palette
            .by_identifier
            .get(identifier)
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_string()))?;
        let entry = &mut palette.entries[index];
        entry.wire = palette_entry(identifier, entry.block.as_ref())?;
        Ok(entry.wire.clone())
    }

    pub fn get(&self, identifier: &str) -> Result<Arc<dyn CustomBlock>, RegistryError> {
        let palette = self.palette.read().unwrap_or_else(PoisonError::into_inner);
        palette
            .by_identifier
            .get(identifier)
            .map(|&index| Arc::clone(&palette.entries[index].block))
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_string()))
    }

    pub fn len(&self) -> usize {
        self.palette
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn palette_entry(identifier: &str, block: &dyn CustomBlock) -> Result<TypeEntry, RegistryError> {
    let numeric_id = block.type_id();
    let mut properties = CompoundTag::new().with_tag("components", block.components());

    let declared = block.block_properties();
    if !declared.is_empty() {
        let encoder = StateEncoder::new(declared)?;
        properties.set_tag("properties", encoder.properties_tag());
    }
    let permutations = block.permutations();
    if !permutations.is_empty() {
        properties.set_tag(
            "permutations",
            Tag::List(
                permutations
                    .iter()
                    .map(|permutation| Tag::Compound(permutation.to_tag()))
                    .collect(),
            ),
        );
    }
    properties
        .set_int("molangVersion", MOLANG_VERSION)
        .set_tag(
            "vanilla_block_data",
            CompoundTag::new().with_tag("block_id", Tag::Int(numeric_id)),
        );

    let wire = TypeEntry {
        identifier: identifier.to_string(),
        numeric_id,
        component_based: true,
        version: ITEM_VERSION_DATA_DRIVEN,
        properties,
    };
    validate(EntryLayout::BlockPalette, &wire)?;
    Ok(wire)
}
