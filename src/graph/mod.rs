//! Resource graph data model and builder.
//!
//! - [`value`]: attribute values, references and expressions
//! - [`node`]: resource kinds, nodes and handles
//! - [`builder`]: the explicit construction context

pub mod builder;
pub mod node;
pub mod value;

pub use builder::{Attributes, Edge, GraphBuilder, Output, ResourceGraph};
pub use node::{NodeHandle, NodeState, ResourceKind, ResourceNode};
pub use value::{AttrRef, AttributeValue, Fragment};
