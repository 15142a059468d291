use std::sync::Arc;

use super::error::{ResolveError, TableError};
use super::table::PrefixTable;

/// What a caller hands to the resolver: an instance identifier or a type token.
///
/// A bare `&str` converts to [`EntityRef::Id`]; use [`EntityRef::collection`]
/// for collection-level calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    /// An opaque identifier such as `cus_123`.
    Id(&'a str),
    /// A plural type token such as `customers`.
    Type(&'a str),
}

impl<'a> EntityRef<'a> {
    #[must_use]
    pub fn id(id: &'a str) -> Self {
        Self::Id(id)
    }

    #[must_use]
    pub fn collection(plural: &'a str) -> Self {
        Self::Type(plural)
    }

    /// The raw input, as given by the caller.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Id(s) | Self::Type(s) => s,
        }
    }
}

impl<'a> From<&'a str> for EntityRef<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a String> for EntityRef<'a> {
    fn from(id: &'a String) -> Self {
        Self::Id(id.as_str())
    }
}

/// Collection path plus optional instance identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub collection_path: &'static str,
    pub instance_id: Option<String>,
}

impl ResolvedResource {
    /// Whether this addresses a single instance rather than the collection.
    #[must_use]
    pub fn is_instance(&self) -> bool {
        self.instance_id.is_some()
    }
}

/// Maps identifiers and type tokens onto the prefix table.
///
/// Cheap to clone; the table is shared.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    table: Arc<PrefixTable>,
}

impl EntityResolver {
    #[must_use]
    pub fn new(table: PrefixTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Resolver over the standard Stripe table.
    ///
    /// # Errors
    ///
    /// Returns the table validation error, if any.
    pub fn standard() -> Result<Self, TableError> {
        PrefixTable::standard().map(Self::new)
    }

    #[must_use]
    pub fn table(&self) -> &PrefixTable {
        &self.table
    }

    /// Resolve an identifier or a type token.
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnrecognizedEntityType`] if nothing in the table matches.
    pub fn resolve<'a>(&self, input: impl Into<EntityRef<'a>>) -> Result<ResolvedResource, ResolveError> {
        match input.into() {
            EntityRef::Id(id) => self.resolve_id(id),
            EntityRef::Type(plural) => self.resolve_collection(plural),
        }
    }

    /// Resolve an instance identifier; the identifier is kept verbatim.
    pub fn resolve_id(&self, id: &str) -> Result<ResolvedResource, ResolveError> {
        self.table
            .match_id(id)
            .map(|resource| ResolvedResource {
                collection_path: resource.collection_path,
                instance_id: Some(id.to_string()),
            })
            .ok_or_else(|| unrecognized(id))
    }

    /// Resolve a plural type token to its collection.
    pub fn resolve_collection(&self, plural: &str) -> Result<ResolvedResource, ResolveError> {
        self.table
            .match_type(plural)
            .map(|resource| ResolvedResource {
                collection_path: resource.collection_path,
                instance_id: None,
            })
            .ok_or_else(|| unrecognized(plural))
    }
}

fn unrecognized(input: &str) -> ResolveError {
    tracing::debug!(
        target: "stripe_gateway::resources",
        input = input,
        "No resource type matches input"
    );
    ResolveError::UnrecognizedEntityType {
        input: input.to_string(),
    }
}
