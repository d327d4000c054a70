use glam::IVec3;

use crate::error::EncodingError;
use crate::events::{BlockUpdate, BlockUpdateSink};
use crate::material::{material_instances, Material, MaterialTarget, RenderMethod};
use crate::permutation::{BlockProperty, Permutation, PropertyValue, RuntimeState, StateEncoder};

pub const TOGGLED_PROPERTY: &str = "lodestone:toggled";

/// Per-type hooks a toggleable block supplies to its [`Toggle`].
pub trait ToggleBlock {
    fn base_texture(&self) -> &str;

    /// Adds type-specific components to the permutation for `toggled`.
    fn additional_components(&self, _permutation: &mut Permutation, _toggled: bool) {}
}

/// `<base>_on` / `<base>_off`.
pub fn toggle_texture(base: &str, toggled: bool) -> String {
    if toggled {
        format!("{base}_on")
    } else {
        format!("{base}_off")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toggle {
    encoder: StateEncoder,
    toggled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self::new(TOGGLED_PROPERTY)
    }
}

impl Toggle {
    pub fn new(property: &str) -> Self {
        Self {
            encoder: StateEncoder::single_boolean(property),
            toggled: false,
        }
    }

    pub fn property(&self) -> &BlockProperty {
        &self.encoder.declare_properties()[0]
    }

    pub fn declare_properties(&self) -> Vec<BlockProperty> {
        self.encoder.declare_properties().to_vec()
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    /// One permutation per state, `false` first, each swapping the material to
    /// the texture `texture_for(state)` names.
    pub fn build_permutations<F>(&self, texture_for: F) -> Vec<Permutation>
    where
        F: Fn(bool) -> String,
    {
        self.build_permutations_with(texture_for, |_, _| {})
    }

    pub fn permutations_for(&self, block: &impl ToggleBlock) -> Vec<Permutation> {
        self.build_permutations_with(
            |toggled| toggle_texture(block.base_texture(), toggled),
            |permutation, toggled| block.additional_components(permutation, toggled),
        )
    }

    fn build_permutations_with<F, G>(&self, texture_for: F, extend: G) -> Vec<Permutation>
    where
        F: Fn(bool) -> String,
        G: Fn(&mut Permutation, bool),
    {
        let property = self.property();
        [false, true]
            .into_iter()
            .map(|toggled| {
                let material = Material::new(
                    MaterialTarget::All,
                    texture_for(toggled),
                    RenderMethod::AlphaTest,
                    false,
                    false,
                );
                let mut permutation = Permutation::new(property.condition(&toggled.into()))
                    .with_component(
                        "minecraft:material_instances",
                        material_instances(&[material]),
                    );
                extend(&mut permutation, toggled);
                permutation
            })
            .collect()
    }

    pub fn current_values(&self) -> Vec<PropertyValue> {
        vec![PropertyValue::Bool(self.toggled)]
    }

    pub fn encode(&self) -> RuntimeState {
        RuntimeState::from_raw(u32::from(self.toggled), self.encoder.width())
    }

    pub fn decode_from(&mut self, state: &RuntimeState) -> Result<(), EncodingError> {
        let values = self.encoder.decode(state)?;
        self.toggled = matches!(values.first(), Some(PropertyValue::Bool(true)));
        Ok(())
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Changes the state and asks the world to persist and re-render the
    /// block at `position`. Returns whether anything changed.
    pub fn set_toggled(
        &mut self,
        toggled: bool,
        position: IVec3,
        world: &impl BlockUpdateSink,
    ) -> bool {
        if self.toggled == toggled {
            return false;
        }
        self.toggled = toggled;
        world.request_update(BlockUpdate {
            position,
            state: self.encode(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{toggle_texture, Toggle, ToggleBlock, TOGGLED_PROPERTY};
    use crate::events::update_channel;
    use crate::nbt::{CompoundTag, Tag};
    use crate::permutation::{Permutation, PropertyValue};

    struct Lamp;

    impl ToggleBlock for Lamp {
        fn base_texture(&self) -> &str {
            "lamp"
        }

        fn additional_components(&self, permutation: &mut Permutation, toggled: bool) {
            permutation.add_component(
                "minecraft:light_emission",
                CompoundTag::new().with_tag("emission", Tag::Byte(if toggled { 15 } else { 0 })),
            );
        }
    }

    fn texture_of(permutation: &Permutation) -> Option<&Tag> {
        permutation
            .components()
            .get_compound("minecraft:material_instances")?
            .get_compound("materials")?
            .get_compound("*")?
            .get("texture")
    }

    #[test]
    fn toggle_builds_two_permutations_off_then_on() {
        let toggle = Toggle::default();
        let permutations = toggle.permutations_for(&Lamp);
        assert_eq!(permutations.len(), 2);

        assert_eq!(
            permutations[0].condition(),
            format!("q.block_property('{TOGGLED_PROPERTY}') == false")
        );
        assert_eq!(
            permutations[1].condition(),
            format!("q.block_property('{TOGGLED_PROPERTY}') == true")
        );
        assert_eq!(texture_of(&permutations[0]), Some(&Tag::String("lamp_off".into())));
        assert_eq!(texture_of(&permutations[1]), Some(&Tag::String("lamp_on".into())));
        assert_ne!(permutations[0].components(), permutations[1].components());

        let emission = permutations[1]
            .components()
            .get_compound("minecraft:light_emission")
            .expect("hook component");
        assert_eq!(emission.get("emission"), Some(&Tag::Byte(15)));
    }

    #[test]
    fn custom_resolver_selects_textures() {
        let toggle = Toggle::new("test:lit");
        let permutations = toggle.build_permutations(|lit| toggle_texture("torch", !lit));
        assert_eq!(texture_of(&permutations[0]), Some(&Tag::String("torch_on".into())));
    }

    #[test]
    fn encode_and_decode_follow_the_flag() {
        let (tx, _rx) = update_channel();
        let mut toggle = Toggle::default();
        assert_eq!(toggle.encode().raw(), 0);

        toggle.set_toggled(true, IVec3::ZERO, &tx);
        let state = toggle.encode();
        assert_eq!(state.raw(), 1);
        assert_eq!(
            toggle.encoder().decode(&state).expect("decode"),
            vec![PropertyValue::Bool(true)]
        );

        let mut restored = Toggle::default();
        restored.decode_from(&state).expect("decode toggle");
        assert!(restored.is_toggled());
        assert_eq!(restored.current_values(), toggle.current_values());
    }

    #[test]
    fn setter_requests_world_update_only_on_change() {
        let (tx, rx) = update_channel();
        let mut toggle = Toggle::default();
        let position = IVec3::new(3, 64, -2);

        assert!(!toggle.set_toggled(false, position, &tx));
        assert!(rx.drain().is_empty());

        assert!(toggle.set_toggled(true, position, &tx));
        let updates = rx.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].position, position);
        assert_eq!(updates[0].state.raw(), 1);
    }
}
