//! The automation graph: data model, containment, name registries and the store
//! that owns them.

pub mod containment;
pub mod document;
pub mod ids;
pub mod model;
pub mod registry;
pub mod store;

pub use containment::*;
pub use document::*;
pub use ids::*;
pub use model::*;
pub use registry::*;
pub use store::*;
