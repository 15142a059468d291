//! Entity resolution.
//!
//! Infers a resource's collection from an identifier prefix or a type token.
//!
//! # Example
//!
//! ```rust
//! use stripe_gateway::resources::{EntityRef, EntityResolver};
//!
//! let resolver = EntityResolver::standard()?;
//!
//! let customer = resolver.resolve("cus_123")?;
//! assert_eq!(customer.collection_path, "customers");
//! assert_eq!(customer.instance_id.as_deref(), Some("cus_123"));
//!
//! let products = resolver.resolve(EntityRef::collection("products"))?;
//! assert!(products.instance_id.is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod resolver;
pub mod table;

pub use error::{ResolveError, TableError};
pub use resolver::{EntityRef, EntityResolver, ResolvedResource};
pub use table::{PrefixTable, ResourceType};
