//! Static prototype data for draftline.
//!
//! This crate provides:
//! - **Schema types** for the prototype tables (RON, JSON, TOML).
//! - **Loader** functions that discover files in a directory and
//!   deserialize them.
//! - **Registry**: the immutable, name-indexed `PrototypeRegistry` every
//!   entity is checked against.
//! - **Vanilla data**: an embedded Factorio 1.1 slice, available through
//!   `PrototypeRegistry::vanilla()`.

pub mod loader;
pub mod registry;
pub mod schema;
pub mod vanilla;

pub use loader::{load_config, load_prototypes_dir, load_prototypes_str, DataLoadError};
pub use registry::{EntityPrototype, PrototypeRegistry, RegistryBuilder, RegistryError};
