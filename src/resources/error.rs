/// Errors raised while building a [`PrefixTable`](super::PrefixTable).
///
/// These are configuration errors and should stop the process at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("resource type '{resource}' declares no identifier prefixes")]
    MissingPrefixes { resource: String },

    #[error("resource type '{resource}' declares an empty identifier prefix")]
    EmptyPrefix { resource: String },

    #[error("type token '{plural}' is declared more than once")]
    DuplicateType { plural: String },

    #[error("identifier prefixes overlap: {first} and {second}")]
    OverlappingPrefixes { first: String, second: String },
}

/// Resolution failures. These can be fixed by the caller and are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unrecognized entity type for '{input}'")]
    UnrecognizedEntityType { input: String },
}
