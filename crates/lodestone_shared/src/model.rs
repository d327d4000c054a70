use glam::Vec3;

use crate::error::GeometryError;
use crate::material::{material_instances, Material};
use crate::nbt::{CompoundTag, Tag};

pub const BOUNDS_MIN: Vec3 = Vec3::new(-8.0, 0.0, -8.0);
pub const BOUNDS_MAX: Vec3 = Vec3::new(8.0, 16.0, 8.0);
pub const FULL_BLOCK_ORIGIN: Vec3 = BOUNDS_MIN;
pub const FULL_BLOCK_SIZE: Vec3 = Vec3::splat(16.0);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoxBounds {
    pub origin: Vec3,
    pub size: Vec3,
}

impl BoxBounds {
    pub const FULL: Self = Self {
        origin: FULL_BLOCK_ORIGIN,
        size: FULL_BLOCK_SIZE,
    };

    fn validate(&self, field: &'static str) -> Result<(), GeometryError> {
        let origin = self.origin;
        let size = self.size;
        if !origin.is_finite() || origin.cmplt(BOUNDS_MIN).any() || origin.cmpgt(BOUNDS_MAX).any() {
            return Err(GeometryError::OutOfRange {
                field,
                value: origin,
            });
        }
        if !size.is_finite() || size.cmplt(Vec3::ZERO).any() {
            return Err(GeometryError::OutOfRange { field, value: size });
        }
        if (origin + size).cmpgt(BOUNDS_MAX).any() {
            return Err(GeometryError::Overflow {
                field,
                origin,
                size,
            });
        }
        Ok(())
    }

    fn to_tag(self, enabled: bool) -> CompoundTag {
        CompoundTag::new()
            .with_tag("enabled", Tag::bool(enabled))
            .with_tag("origin", Tag::float_list(self.origin.to_array()))
            .with_tag("size", Tag::float_list(self.size.to_array()))
    }
}

/// Visual and physical description of a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    materials: Vec<Material>,
    geometry: Option<String>,
    collision: BoxBounds,
    selection: BoxBounds,
    collidable: bool,
}

impl Model {
    pub fn builder(materials: Vec<Material>) -> ModelBuilder {
        ModelBuilder {
            materials,
            geometry: None,
            collision_origin: None,
            collision_size: None,
            selection_origin: None,
            selection_size: None,
            collidable: true,
        }
    }

    /// A plain textured cube.
    pub fn unit_cube(materials: Vec<Material>) -> Self {
        Self {
            materials,
            geometry: None,
            collision: BoxBounds::FULL,
            selection: BoxBounds::FULL,
            collidable: true,
        }
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn geometry(&self) -> Option<&str> {
        self.geometry.as_deref()
    }

    pub fn collision(&self) -> BoxBounds {
        self.collision
    }

    pub fn selection(&self) -> BoxBounds {
        self.selection
    }

    /// Renders the model into block components.
    ///
    /// Without a geometry only `material_instances` and `unit_cube` are
    /// written; the client then assumes a full collision cube.
    pub fn to_components(&self) -> CompoundTag {
        let mut components = CompoundTag::new()
            .with_tag("minecraft:material_instances", material_instances(&self.materials));

        match &self.geometry {
            None => {
                components.set_tag("minecraft:unit_cube", CompoundTag::new());
            }
            Some(geometry) => {
                components
                    .set_tag(
                        "minecraft:geometry",
                        CompoundTag::new().with_tag("identifier", Tag::String(geometry.clone())),
                    )
                    .set_tag(
                        "minecraft:collision_box",
                        self.collision.to_tag(self.collidable),
                    )
                    .set_tag("minecraft:selection_box", self.selection.to_tag(true));
            }
        }

        components
    }
}

#[derive(Clone, Debug)]
pub struct ModelBuilder {
    materials: Vec<Material>,
    geometry: Option<String>,
    collision_origin: Option<Vec3>,
    collision_size: Option<Vec3>,
    selection_origin: Option<Vec3>,
    selection_size: Option<Vec3>,
    collidable: bool,
}

impl ModelBuilder {
    pub fn geometry(mut self, identifier: impl Into<String>) -> Self {
        self.geometry = Some(identifier.into());
        self
    }

    pub fn collision(mut self, origin: Vec3, size: Vec3) -> Self {
        self.collision_origin = Some(origin);
        self.collision_size = Some(size);
        self
    }

    pub fn selection(mut self, origin: Vec3, size: Vec3) -> Self {
        self.selection_origin = Some(origin);
        self.selection_size = Some(size);
        self
    }

    pub fn collidable(mut self, collidable: bool) -> Self {
        self.collidable = collidable;
        self
    }

    /// Resolves defaults and checks both boxes against the block cell.
    ///
    /// Selection origin and size each fall back to the collision value, then
    /// to the full block.
    pub fn build(self) -> Result<Model, GeometryError> {
        let collision = BoxBounds {
            origin: self.collision_origin.unwrap_or(FULL_BLOCK_ORIGIN),
            size: self.collision_size.unwrap_or(FULL_BLOCK_SIZE),
        };
        let selection = BoxBounds {
            origin: self
                .selection_origin
                .or(self.collision_origin)
                .unwrap_or(FULL_BLOCK_ORIGIN),
            size: self
                .selection_size
                .or(self.collision_size)
                .unwrap_or(FULL_BLOCK_SIZE),
        };

        collision.validate("collision box")?;
        selection.validate("selection box")?;

        Ok(Model {
            materials: self.materials,
            geometry: self.geometry,
            collision,
            selection,
            collidable: self.collidable,
        })
    }
}
