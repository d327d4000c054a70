use serde::{Deserialize, Serialize};

use crate::connection::ConnectionContext;
use crate::nbt::{CompoundTag, Tag};

fn default_max_stack_size() -> i32 {
    64
}

/// Client-visible components of a data-driven item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemComponents {
    pub texture: String,
    pub display_name: String,
    #[serde(default = "default_max_stack_size")]
    pub max_stack_size: i32,
    #[serde(default)]
    pub allow_off_hand: bool,
    #[serde(default)]
    pub hand_equipped: bool,
    /// Icon switches to `<texture>_<pixels>` for clients that picked a
    /// texture resolution.
    #[serde(default)]
    pub resolution_variants: bool,
}

impl ItemComponents {
    pub fn new(texture: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            display_name: display_name.into(),
            max_stack_size: default_max_stack_size(),
            allow_off_hand: false,
            hand_equipped: false,
            resolution_variants: false,
        }
    }

    pub fn icon_texture(&self, context: Option<&ConnectionContext>) -> String {
        match context.and_then(|context| context.texture_resolution) {
            Some(resolution) if self.resolution_variants => {
                format!("{}_{}", self.texture, resolution.pixels())
            }
            _ => self.texture.clone(),
        }
    }

    pub fn to_tree(&self, context: Option<&ConnectionContext>) -> CompoundTag {
        let icon = CompoundTag::new().with_tag(
            "textures",
            CompoundTag::new().with_tag("default", Tag::String(self.icon_texture(context))),
        );
        let item_properties = CompoundTag::new()
            .with_tag("max_stack_size", Tag::Int(self.max_stack_size))
            .with_tag("allow_off_hand", Tag::bool(self.allow_off_hand))
            .with_tag("hand_equipped", Tag::bool(self.hand_equipped));

        let components = CompoundTag::new()
            .with_tag("minecraft:icon", icon)
            .with_tag(
                "minecraft:display_name",
                CompoundTag::new().with_tag("value", Tag::String(self.display_name.clone())),
            )
            .with_tag("item_properties", item_properties);

        CompoundTag::new().with_tag("components", components)
    }
}

#[cfg(test)]
mod tests {
    use super::ItemComponents;
    use crate::connection::{ConnectionContext, TextureResolution};
    use crate::nbt::Tag;

    fn icon(components: &ItemComponents, context: Option<&ConnectionContext>) -> Tag {
        components
            .to_tree(context)
            .get_compound("components")
            .and_then(|c| c.get_compound("minecraft:icon"))
            .and_then(|c| c.get_compound("textures"))
            .and_then(|c| c.get("default"))
            .cloned()
            .expect("icon texture")
    }

    #[test]
    fn resolution_variant_changes_icon_only_when_enabled() {
        let context = ConnectionContext::with_resolution(TextureResolution::X32);
        let mut ruby = ItemComponents::new("ruby", "Ruby");

        assert_eq!(icon(&ruby, Some(&context)), Tag::String("ruby".into()));

        ruby.resolution_variants = true;
        assert_eq!(icon(&ruby, None), Tag::String("ruby".into()));
        assert_eq!(icon(&ruby, Some(&ConnectionContext::default())), Tag::String("ruby".into()));
        assert_eq!(icon(&ruby, Some(&context)), Tag::String("ruby_32".into()));
    }

    #[test]
    fn item_properties_carry_stack_size() {
        let mut sword = ItemComponents::new("sword", "Sword");
        sword.max_stack_size = 1;
        sword.hand_equipped = true;
        let tree = sword.to_tree(None);
        let properties = tree
            .get_compound("components")
            .and_then(|c| c.get_compound("item_properties"))
            .expect("item properties");
        assert_eq!(properties.get("max_stack_size"), Some(&Tag::Int(1)));
        assert_eq!(properties.get("hand_equipped"), Some(&Tag::Byte(1)));
    }
}
