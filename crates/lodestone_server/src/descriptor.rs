use std::fmt;

use lodestone_shared::connection::ConnectionContext;
use lodestone_shared::model::Model;
use lodestone_shared::nbt::{CompoundTag, Tag};
use lodestone_shared::permutation::{BlockProperty, Permutation};
use lodestone_shared::toggle::Toggle;

/// Source of a custom item's client-visible description.
pub trait CustomItem: Send + Sync + fmt::Debug {
    /// Intrinsic numeric type slot; becomes the item's protocol id.
    fn type_id(&self) -> i32;

    /// Component tree, without the `id` and `name` keys the registry adds.
    fn components(&self, context: Option<&ConnectionContext>) -> CompoundTag;

    /// Whether `components` varies with the connection context.
    fn is_connection_dependent(&self) -> bool {
        false
    }
}

/// Source of a custom block's client-visible description.
pub trait CustomBlock: Send + Sync + fmt::Debug {
    fn type_id(&self) -> i32;

    fn model(&self) -> &Model;

    fn light_emission(&self) -> u8 {
        0
    }

    fn components(&self) -> CompoundTag {
        let mut components = self.model().to_components();
        let emission = self.light_emission().min(15);
        if emission > 0 {
            components.set_tag(
                "minecraft:light_emission",
                CompoundTag::new().with_tag("emission", Tag::Byte(emission as i8)),
            );
        }
        components
    }

    /// Declared state properties; order fixes the runtime state layout.
    fn block_properties(&self) -> Vec<BlockProperty> {
        Vec::new()
    }

    fn permutations(&self) -> Vec<Permutation> {
        Vec::new()
    }

    /// On/off state the block was declared with, if any.
    fn toggle(&self) -> Option<&Toggle> {
        None
    }
}
