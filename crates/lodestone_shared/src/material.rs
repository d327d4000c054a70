use serde::{Deserialize, Serialize};

use crate::nbt::{CompoundTag, Tag};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialTarget {
    All,
    Sides,
    Up,
    Down,
    North,
    East,
    South,
    West,
}

impl MaterialTarget {
    pub fn key(self) -> &'static str {
        match self {
            MaterialTarget::All => "*",
            MaterialTarget::Sides => "sides",
            MaterialTarget::Up => "up",
            MaterialTarget::Down => "down",
            MaterialTarget::North => "north",
            MaterialTarget::East => "east",
            MaterialTarget::South => "south",
            MaterialTarget::West => "west",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMethod {
    #[default]
    Opaque,
    AlphaTest,
    Blend,
    DoubleSided,
}

impl RenderMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMethod::Opaque => "opaque",
            RenderMethod::AlphaTest => "alpha_test",
            RenderMethod::Blend => "blend",
            RenderMethod::DoubleSided => "double_sided",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub target: MaterialTarget,
    pub texture: String,
    pub render_method: RenderMethod,
    pub face_dimming: bool,
    pub ambient_occlusion: bool,
}

impl Material {
    pub fn new(
        target: MaterialTarget,
        texture: impl Into<String>,
        render_method: RenderMethod,
        face_dimming: bool,
        ambient_occlusion: bool,
    ) -> Self {
        Self {
            target,
            texture: texture.into(),
            render_method,
            face_dimming,
            ambient_occlusion,
        }
    }

    /// Opaque material applied to every face, with dimming and AO on.
    pub fn all(texture: impl Into<String>) -> Self {
        Self::new(MaterialTarget::All, texture, RenderMethod::Opaque, true, true)
    }

    pub fn to_tag(&self) -> CompoundTag {
        CompoundTag::new()
            .with_tag("texture", Tag::String(self.texture.clone()))
            .with_tag("render_method", Tag::String(self.render_method.as_str().into()))
            .with_tag("face_dimming", Tag::bool(self.face_dimming))
            .with_tag("ambient_occlusion", Tag::bool(self.ambient_occlusion))
    }
}

/// Builds the `minecraft:material_instances` component.
///
/// The client crashes without the `mappings` compound even though it is always
/// sent empty.
pub fn material_instances(materials: &[Material]) -> CompoundTag {
    let mut by_target = CompoundTag::new();
    for material in materials {
        by_target.set_tag(material.target.key(), material.to_tag());
    }

    CompoundTag::new()
        .with_tag("mappings", CompoundTag::new())
        .with_tag("materials", by_target)
}
