use crate::error::TreeError;
use crate::nbt::{encode_network, CompoundTag, Tag};
use crate::protocol::TypeEntry;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryLayout {
    /// Data-driven item: `components`, `id` and `name`.
    ItemComponents,
    /// Item form of a custom block; no client-side properties.
    BlockItem,
    /// Block palette entry: `components` and `vanilla_block_data.block_id`.
    BlockPalette,
}

impl EntryLayout {
    pub fn for_item(entry: &TypeEntry) -> Self {
        if entry.component_based {
            EntryLayout::ItemComponents
        } else {
            EntryLayout::BlockItem
        }
    }
}

/// Checks the keys `layout` requires and that the tree encodes as network NBT.
pub fn validate(layout: EntryLayout, entry: &TypeEntry) -> Result<(), TreeError> {
    require_keys(layout, entry)?;
    encode_network(&entry.properties).map_err(|source| TreeError::Unencodable {
        identifier: entry.identifier.clone(),
        source,
    })?;
    Ok(())
}

fn require_keys(layout: EntryLayout, entry: &TypeEntry) -> Result<(), TreeError> {
    let tree = &entry.properties;
    match layout {
        EntryLayout::BlockItem => Ok(()),
        EntryLayout::ItemComponents => {
            require_compound(entry, tree, "components")?;
            let id = require(entry, tree, "id")?
                .as_int()
                .ok_or_else(|| wrong_type(entry, "id"))?;
            if id != entry.numeric_id {
                return Err(TreeError::IdMismatch {
                    identifier: entry.identifier.clone(),
                    expected: entry.numeric_id,
                    found: id,
                });
            }
            let name = require(entry, tree, "name")?
                .as_str()
                .ok_or_else(|| wrong_type(entry, "name"))?;
            if name != entry.identifier {
                return Err(TreeError::NameMismatch {
                    identifier: entry.identifier.clone(),
                    found: name.to_string(),
                });
            }
            Ok(())
        }
        EntryLayout::BlockPalette => {
            require_compound(entry, tree, "components")?;
            let block_data = require_compound(entry, tree, "vanilla_block_data")?;
            require(entry, block_data, "block_id")?
                .as_int()
                .ok_or_else(|| wrong_type(entry, "block_id"))?;
            Ok(())
        }
    }
}

fn require<'a>(
    entry: &TypeEntry,
    tree: &'a CompoundTag,
    key: &'static str,
) -> Result<&'a Tag, TreeError> {
    tree.get(key).ok_or_else(|| TreeError::MissingKey {
        identifier: entry.identifier.clone(),
        key,
    })
}

fn require_compound<'a>(
    entry: &TypeEntry,
    tree: &'a CompoundTag,
    key: &'static str,
) -> Result<&'a CompoundTag, TreeError> {
    require(entry, tree, key)?
        .as_compound()
        .ok_or_else(|| wrong_type(entry, key))
}

fn wrong_type(entry: &TypeEntry, key: &'static str) -> TreeError {
    TreeError::WrongType {
        identifier: entry.identifier.clone(),
        key,
    }
}
