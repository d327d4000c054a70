pub mod connection;
pub mod error;
pub mod events;
pub mod item;
pub mod material;
pub mod model;
pub mod nbt;
pub mod permutation;
pub mod protocol;
pub mod schema;
pub mod toggle;
