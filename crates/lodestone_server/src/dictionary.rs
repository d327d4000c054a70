use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::registry::RegistryError;

/// Base-game items the dictionary starts with. Custom ids must stay clear of these.
pub const VANILLA_ITEMS: &[(&str, i32)] = &[
    ("minecraft:air", 0),
    ("minecraft:stone", 1),
    ("minecraft:grass_block", 2),
    ("minecraft:dirt", 3),
    ("minecraft:cobblestone", 4),
    ("minecraft:planks", 5),
    ("minecraft:diamond", 304),
    ("minecraft:stick", 320),
];

/// Protocol-level identifier <-> numeric id table.
///
/// After a successful publish a lookup by either side returns the other.
pub trait TypeDictionary: Send + Sync {
    fn publish(&self, identifier: &str, numeric_id: i32) -> Result<(), RegistryError>;

    fn numeric_id(&self, identifier: &str) -> Option<i32>;

    fn identifier(&self, numeric_id: i32) -> Option<String>;
}

/// Records which block an item places.
pub trait BlockItemBridge: Send + Sync {
    fn link(&self, item_identifier: &str, block_identifier: &str);

    fn block_for_item(&self, item_identifier: &str) -> Option<String>;
}

#[derive(Default)]
struct DictionaryMaps {
    by_identifier: FxHashMap<String, i32>,
    by_numeric: FxHashMap<i32, String>,
}

#[derive(Default)]
pub struct ItemTypeDictionary {
    maps: RwLock<DictionaryMaps>,
}

impl ItemTypeDictionary {
    pub fn with_vanilla(entries: &[(&str, i32)]) -> Self {
        let mut maps = DictionaryMaps::default();
        for &(identifier, numeric_id) in entries {
            maps.by_identifier.insert(identifier.to_string(), numeric_id);
            maps.by_numeric.insert(numeric_id, identifier.to_string());
        }
        Self {
            maps: RwLock::new(maps),
        }
    }

    pub fn len(&self) -> usize {
        self.maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_identifier
            .len()
    }
}

impl TypeDictionary for ItemTypeDictionary {
    fn publish(&self, identifier: &str, numeric_id: i32) -> Result<(), RegistryError> {
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        if maps.by_identifier.contains_key(identifier) {
            return Err(RegistryError::ReservedIdentifier(identifier.to_string()));
        }
        if let Some(owner) = maps.by_numeric.get(&numeric_id) {
            return Err(RegistryError::NumericIdInUse {
                identifier: identifier.to_string(),
                numeric_id,
                owner: owner.clone(),
            });
        }
        maps.by_identifier.insert(identifier.to_string(), numeric_id);
        maps.by_numeric.insert(numeric_id, identifier.to_string());
        Ok(())
    }

    fn numeric_id(&self, identifier: &str) -> Option<i32> {
        self.maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_identifier
            .get(identifier)
            .copied()
    }

    fn identifier(&self, numeric_id: i32) -> Option<String> {
        self.maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_numeric
            .get(&numeric_id)
            .cloned()
    }
}

#[derive(Default)]
pub struct BlockItemIdMap {
    item_to_block: RwLock<FxHashMap<String, String>>,
}

impl BlockItemIdMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockItemBridge for BlockItemIdMap {
    fn link(&self, item_identifier: &str, block_identifier: &str) {
        self.item_to_block
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_identifier.to_string(), block_identifier.to_string());
    }

    fn block_for_item(&self, item_identifier: &str) -> Option<String> {
        self.item_to_block
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_identifier)
            .cloned()
    }
}
