use std::sync::{Arc, PoisonError, RwLock};

use lodestone_shared::connection::ConnectionContext;
use lodestone_shared::nbt::CompoundTag;
use lodestone_shared::protocol::{TypeEntry, ITEM_VERSION_DATA_DRIVEN, ITEM_VERSION_NONE};
use lodestone_shared::schema::{validate, EntryLayout};
use rustc_hash::FxHashMap;
use tracing::info;

use super::RegistryError;
use crate::descriptor::{CustomBlock, CustomItem};
use crate::dictionary::{BlockItemBridge, TypeDictionary};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Item,
    BlockItem,
}

#[derive(Clone, Debug)]
pub enum EntrySource {
    Item(Arc<dyn CustomItem>),
    Block(Arc<dyn CustomBlock>),
}

#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub kind: EntryKind,
    pub wire: TypeEntry,
    pub source: EntrySource,
}

#[derive(Default)]
struct ItemTable {
    entries: Vec<RegistryEntry>,
    by_identifier: FxHashMap<String, usize>,
}

impl ItemTable {
    fn push(&mut self, entry: RegistryEntry) {
        self.by_identifier
            .insert(entry.wire.identifier.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Custom item types in registration order, with their canonical trees.
pub struct ItemRegistry {
    dictionary: Arc<dyn TypeDictionary>,
    bridge: Arc<dyn BlockItemBridge>,
    table: RwLock<ItemTable>,
}

impl ItemRegistry {
    pub fn new(dictionary: Arc<dyn TypeDictionary>, bridge: Arc<dyn BlockItemBridge>) -> Self {
        Self {
            dictionary,
            bridge,
            table: RwLock::new(ItemTable::default()),
        }
    }

    pub fn dictionary(&self) -> &dyn TypeDictionary {
        self.dictionary.as_ref()
    }

    pub fn bridge(&self) -> &dyn BlockItemBridge {
        self.bridge.as_ref()
    }

    /// Registers a data-driven item under its intrinsic type id.
    pub fn register_item(
        &self,
        identifier: &str,
        item: Arc<dyn CustomItem>,
    ) -> Result<i32, RegistryError> {
        let numeric_id = item.type_id();
        let wire = item_entry(identifier, numeric_id, item.components(None));
        validate(EntryLayout::ItemComponents, &wire)?;

        self.insert(RegistryEntry {
            kind: EntryKind::Item,
            wire,
            source: EntrySource::Item(item),
        })?;
        info!("registered item {identifier} as {numeric_id}");
        Ok(numeric_id)
    }

    /// Registers the item form of a custom block. It carries no client-side
    /// components and shares the block's type id.
    pub fn register_block_item(
        &self,
        identifier: &str,
        block: Arc<dyn CustomBlock>,
    ) -> Result<i32, RegistryError> {
        let numeric_id = block.type_id();
        let wire = TypeEntry {
            identifier: identifier.to_string(),
            numeric_id,
            component_based: false,
            version: ITEM_VERSION_NONE,
            properties: CompoundTag::new(),
        };

        self.insert(RegistryEntry {
            kind: EntryKind::BlockItem,
            wire,
            source: EntrySource::Block(block),
        })?;
        self.bridge.link(identifier, identifier);
        info!("registered block item {identifier} as {numeric_id}");
        Ok(numeric_id)
    }

    fn insert(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let identifier = &entry.wire.identifier;
        if table.by_identifier.contains_key(identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier.clone()));
        }
        self.dictionary.publish(identifier, entry.wire.numeric_id)?;
        table.push(entry);
        Ok(())
    }

    /// Wire entries in registration order.
    pub fn table_entries(&self) -> Vec<TypeEntry> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|entry| entry.wire.clone())
            .collect()
    }

    /// Entries of connection-dependent items rebuilt for `context`, keyed by
    /// identifier. Canonical entries are left as they are. Rebuilt trees are
    /// not validated here; the synchronizer checks each one before use.
    pub fn regenerate_for(&self, context: &ConnectionContext) -> FxHashMap<String, TypeEntry> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .iter()
            .filter_map(|entry| match &entry.source {
                EntrySource::Item(item) if item.is_connection_dependent() => {
                    let identifier = &entry.wire.identifier;
                    let wire = item_entry(
                        identifier,
                        entry.wire.numeric_id,
                        item.components(Some(context)),
                    );
                    Some((identifier.clone(), wire))
                }
                _ => None,
            })
            .collect()
    }

    /// The generic table, or with a context only the entries that differ for it.
    pub fn component_entries(&self, context: Option<&ConnectionContext>) -> Vec<TypeEntry> {
        match context {
            Some(context) => {
                let regenerated = self.regenerate_for(context);
                self.table_entries()
                    .into_iter()
                    .filter_map(|entry| regenerated.get(&entry.identifier).cloned())
                    .collect()
            }
            None => self.table_entries(),
        }
    }

    pub fn get(&self, identifier: &str) -> Result<RegistryEntry, RegistryError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .by_identifier
            .get(identifier)
            .map(|&index| table.entries[index].clone())
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_string()))
    }

    pub fn numeric_id(&self, identifier: &str) -> Option<i32> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .by_identifier
            .get(identifier)
            .map(|&index| table.entries[index].wire.numeric_id)
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn item_entry(identifier: &str, numeric_id: i32, mut properties: CompoundTag) -> TypeEntry {
    properties
        .set_int("id", numeric_id)
        .set_string("name", identifier);
    TypeEntry {
        identifier: identifier.to_string(),
        numeric_id,
        component_based: true,
        version: ITEM_VERSION_DATA_DRIVEN,
        properties,
    }
}
