mod block;
mod item;

use lodestone_shared::error::{EncodingError, GeometryError, TreeError};
use thiserror::Error;

pub use block::BlockRegistry;
pub use item::{EntryKind, EntrySource, ItemRegistry};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("identifier '{0}' is already registered")]
    DuplicateIdentifier(String),
    #[error("identifier '{0}' is not registered")]
    UnknownIdentifier(String),
    #[error("identifier '{0}' is already bound in the type dictionary")]
    ReservedIdentifier(String),
    #[error("numeric id {numeric_id} for '{identifier}' is already bound to '{owner}'")]
    NumericIdInUse {
        identifier: String,
        numeric_id: i32,
        owner: String,
    },
    #[error("malformed property tree: {0}")]
    MalformedPropertyTree(#[from] TreeError),
    #[error("invalid block state declaration: {0}")]
    Encoding(#[from] EncodingError),
    #[error("invalid block geometry: {0}")]
    Geometry(#[from] GeometryError),
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use lodestone_shared::connection::ConnectionContext;
    use lodestone_shared::item::ItemComponents;
    use lodestone_shared::material::Material;
    use lodestone_shared::model::Model;
    use lodestone_shared::nbt::{CompoundTag, Tag};
    use lodestone_shared::permutation::{BlockProperty, Permutation};
    use lodestone_shared::toggle::{Toggle, ToggleBlock};

    use super::{BlockRegistry, ItemRegistry};
    use crate::descriptor::{CustomBlock, CustomItem};
    use crate::dictionary::{BlockItemIdMap, ItemTypeDictionary, VANILLA_ITEMS};

    #[derive(Debug)]
    pub struct TestItem {
        pub type_id: i32,
        pub components: ItemComponents,
    }

    impl TestItem {
        pub fn new(type_id: i32, texture: &str) -> Arc<Self> {
            Arc::new(Self {
                type_id,
                components: ItemComponents::new(texture, texture),
            })
        }

        pub fn resolution_aware(type_id: i32, texture: &str) -> Arc<Self> {
            let mut components = ItemComponents::new(texture, texture);
            components.resolution_variants = true;
            Arc::new(Self {
                type_id,
                components,
            })
        }
    }

    impl CustomItem for TestItem {
        fn type_id(&self) -> i32 {
            self.type_id
        }

        fn components(&self, context: Option<&ConnectionContext>) -> CompoundTag {
            self.components.to_tree(context)
        }

        fn is_connection_dependent(&self) -> bool {
            self.components.resolution_variants
        }
    }

    /// Returns a tree without the `components` key once connection specific.
    #[derive(Debug)]
    pub struct BrokenVariantItem;

    impl CustomItem for BrokenVariantItem {
        fn type_id(&self) -> i32 {
            9500
        }

        fn components(&self, context: Option<&ConnectionContext>) -> CompoundTag {
            match context {
                Some(_) => CompoundTag::new(),
                None => ItemComponents::new("broken", "Broken").to_tree(None),
            }
        }

        fn is_connection_dependent(&self) -> bool {
            true
        }
    }

    /// Connection-specific tree carries a list mixing tag types.
    #[derive(Debug)]
    pub struct MixedListVariantItem;

    impl CustomItem for MixedListVariantItem {
        fn type_id(&self) -> i32 {
            9700
        }

        fn components(&self, context: Option<&ConnectionContext>) -> CompoundTag {
            let mut tree = ItemComponents::new("mixed", "Mixed").to_tree(context);
            if context.is_some() {
                tree.set_tag("bad", Tag::List(vec![Tag::Int(1), Tag::Byte(1)]));
            }
            tree
        }

        fn is_connection_dependent(&self) -> bool {
            true
        }
    }

    #[derive(Debug)]
    pub struct TestBlock {
        pub type_id: i32,
        pub texture: String,
        pub model: Model,
        pub toggle: Option<Toggle>,
    }

    impl TestBlock {
        pub fn cube(type_id: i32, texture: &str) -> Arc<Self> {
            Arc::new(Self {
                type_id,
                texture: texture.to_string(),
                model: Model::unit_cube(vec![Material::all(texture)]),
                toggle: None,
            })
        }

        pub fn toggleable(type_id: i32, texture: &str) -> Arc<Self> {
            Arc::new(Self {
                type_id,
                texture: texture.to_string(),
                model: Model::unit_cube(vec![Material::all(texture)]),
                toggle: Some(Toggle::default()),
            })
        }
    }

    impl ToggleBlock for TestBlock {
        fn base_texture(&self) -> &str {
            &self.texture
        }
    }

    impl CustomBlock for TestBlock {
        fn type_id(&self) -> i32 {
            self.type_id
        }

        fn model(&self) -> &Model {
            &self.model
        }

        fn block_properties(&self) -> Vec<BlockProperty> {
            self.toggle
                .as_ref()
                .map(Toggle::declare_properties)
                .unwrap_or_default()
        }

        fn permutations(&self) -> Vec<Permutation> {
            self.toggle
                .as_ref()
                .map(|toggle| toggle.permutations_for(self))
                .unwrap_or_default()
        }

        fn toggle(&self) -> Option<&Toggle> {
            self.toggle.as_ref()
        }
    }

    pub fn registries() -> (Arc<ItemRegistry>, Arc<BlockRegistry>) {
        let items = Arc::new(ItemRegistry::new(
            Arc::new(ItemTypeDictionary::with_vanilla(VANILLA_ITEMS)),
            Arc::new(BlockItemIdMap::new()),
        ));
        let blocks = Arc::new(BlockRegistry::new(Arc::clone(&items)));
        (items, blocks)
    }
}
