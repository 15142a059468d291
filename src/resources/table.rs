//! Static mapping from identifier prefix to resource type.
//!
//! Stripe identifiers carry their type as a prefix (`cus_`, `sub_`, `pi_`, ...),
//! so a call site only needs the identifier to know which collection it
//! belongs to. The table is validated once when it is built: every prefix must
//! belong to exactly one resource type, otherwise resolution order would start
//! to matter.

use super::error::TableError;

/// A named category of remote entity and its path and identifier conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    /// Singular name, e.g. `customer`.
    pub name: &'static str,
    /// Plural name, used as the type token, e.g. `customers`.
    pub plural: &'static str,
    /// Path segment(s) below `/v1`, e.g. `customers` or `checkout/sessions`.
    pub collection_path: &'static str,
    /// Identifier prefixes owned by this type, in declaration order.
    pub id_prefixes: &'static [&'static str],
}

impl ResourceType {
    /// Declare a resource type.
    #[must_use]
    pub const fn new(
        name: &'static str,
        plural: &'static str,
        collection_path: &'static str,
        id_prefixes: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            plural,
            collection_path,
            id_prefixes,
        }
    }
}

/// Resource types known to the standard Stripe API table.
const STANDARD_RESOURCES: &[ResourceType] = &[
    ResourceType::new("customer", "customers", "customers", &["cus_"]),
    ResourceType::new("product", "products", "products", &["prod_"]),
    ResourceType::new("price", "prices", "prices", &["price_"]),
    ResourceType::new("invoice", "invoices", "invoices", &["in_"]),
    ResourceType::new("invoice_item", "invoiceitems", "invoiceitems", &["ii_"]),
    ResourceType::new("subscription", "subscriptions", "subscriptions", &["sub_"]),
    ResourceType::new(
        "subscription_item",
        "subscription_items",
        "subscription_items",
        &["si_"],
    ),
    ResourceType::new("payment_intent", "payment_intents", "payment_intents", &["pi_"]),
    ResourceType::new("setup_intent", "setup_intents", "setup_intents", &["seti_"]),
    ResourceType::new(
        "payment_method",
        "payment_methods",
        "payment_methods",
        &["pm_", "card_", "src_"],
    ),
    ResourceType::new("charge", "charges", "charges", &["ch_", "py_"]),
    ResourceType::new("refund", "refunds", "refunds", &["re_", "pyr_"]),
    ResourceType::new("dispute", "disputes", "disputes", &["dp_", "du_"]),
    ResourceType::new("payout", "payouts", "payouts", &["po_"]),
    ResourceType::new("transfer", "transfers", "transfers", &["tr_"]),
    ResourceType::new(
        "balance_transaction",
        "balance_transactions",
        "balance_transactions",
        &["txn_"],
    ),
    ResourceType::new("event", "events", "events", &["evt_"]),
    ResourceType::new("file", "files", "files", &["file_"]),
    ResourceType::new(
        "checkout_session",
        "checkout_sessions",
        "checkout/sessions",
        &["cs_"],
    ),
    ResourceType::new(
        "billing_portal_session",
        "billing_portal_sessions",
        "billing_portal/sessions",
        &["bps_"],
    ),
    ResourceType::new("tax_rate", "tax_rates", "tax_rates", &["txr_"]),
    ResourceType::new("promotion_code", "promotion_codes", "promotion_codes", &["promo_"]),
    ResourceType::new(
        "webhook_endpoint",
        "webhook_endpoints",
        "webhook_endpoints",
        &["we_"],
    ),
    ResourceType::new("credit_note", "credit_notes", "credit_notes", &["cn_"]),
    ResourceType::new("quote", "quotes", "quotes", &["qt_"]),
    ResourceType::new("account", "accounts", "accounts", &["acct_"]),
    ResourceType::new("application_fee", "application_fees", "application_fees", &["fee_"]),
    ResourceType::new("topup", "topups", "topups", &["tu_"]),
    ResourceType::new("mandate", "mandates", "mandates", &["mandate_"]),
    ResourceType::new("review", "reviews", "reviews", &["prv_"]),
];

/// Validated, immutable prefix table.
///
/// Lookup order is longest prefix first; prefixes of equal length keep their
/// declaration order.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    types: Vec<ResourceType>,
    /// `(prefix, index into types)`, sorted for lookup.
    lookup: Vec<(&'static str, usize)>,
}

impl PrefixTable {
    /// Build a table from explicit resource types.
    ///
    /// # Errors
    ///
    /// Fails if a type has no prefixes, a prefix is empty, two types share a
    /// plural token, or a prefix of one type overlaps a prefix of another.
    pub fn new(types: Vec<ResourceType>) -> Result<Self, TableError> {
        let mut lookup = Vec::new();

        for (index, resource) in types.iter().enumerate() {
            if resource.id_prefixes.is_empty() {
                return Err(TableError::MissingPrefixes {
                    resource: resource.name.to_string(),
                });
            }

            if types[..index].iter().any(|other| other.plural == resource.plural) {
                return Err(TableError::DuplicateType {
                    plural: resource.plural.to_string(),
                });
            }

            for &prefix in resource.id_prefixes {
                if prefix.is_empty() {
                    return Err(TableError::EmptyPrefix {
                        resource: resource.name.to_string(),
                    });
                }
                lookup.push((prefix, index));
            }
        }

        // Prefixes of the same type may overlap each other harmlessly; across
        // types an identifier could match both, which is rejected.
        for (i, &(a, owner_a)) in lookup.iter().enumerate() {
            for &(b, owner_b) in &lookup[i + 1..] {
                if owner_a != owner_b && (a.starts_with(b) || b.starts_with(a)) {
                    return Err(TableError::OverlappingPrefixes {
                        first: format!("{} ({})", a, types[owner_a].name),
                        second: format!("{} ({})", b, types[owner_b].name),
                    });
                }
            }
        }

        // Stable sort keeps declaration order among equal lengths.
        lookup.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

        Ok(Self { types, lookup })
    }

    /// The standard Stripe resource table.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in declarations are edited into an invalid state.
    pub fn standard() -> Result<Self, TableError> {
        Self::new(STANDARD_RESOURCES.to_vec())
    }

    /// Find the resource type owning the longest matching prefix of `id`.
    #[must_use]
    pub fn match_id(&self, id: &str) -> Option<&ResourceType> {
        self.lookup
            .iter()
            .find(|(prefix, _)| id.starts_with(prefix))
            .map(|&(_, index)| &self.types[index])
    }

    /// Find a resource type by its plural type token.
    #[must_use]
    pub fn match_type(&self, plural: &str) -> Option<&ResourceType> {
        self.types.iter().find(|resource| resource.plural == plural)
    }

    /// All resource types in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_valid() {
        let table = PrefixTable::standard().unwrap();
        assert_eq!(table.len(), STANDARD_RESOURCES.len());
    }

    #[test]
    fn test_match_id_uses_prefix() {
        let table = PrefixTable::standard().unwrap();

        assert_eq!(table.match_id("cus_123").unwrap().plural, "customers");
        assert_eq!(table.match_id("sub_1Nabc").unwrap().plural, "subscriptions");
        assert_eq!(table.match_id("si_1Nabc").unwrap().plural, "subscription_items");
        assert_eq!(table.match_id("cs_test_a1").unwrap().collection_path, "checkout/sessions");
        assert_eq!(table.match_id("card_42").unwrap().plural, "payment_methods");
        assert!(table.match_id("zzz_1").is_none());
        assert!(table.match_id("cus").is_none());
    }

    #[test]
    fn test_match_type_requires_plural_token() {
        let table = PrefixTable::standard().unwrap();

        assert_eq!(table.match_type("customers").unwrap().name, "customer");
        assert!(table.match_type("customer").is_none());
        assert!(table.match_type("Customers").is_none());
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let result = PrefixTable::new(vec![
            ResourceType::new("payment", "payments", "payments", &["pay_"]),
            ResourceType::new("payout", "payouts", "payouts", &["pay_out_"]),
        ]);

        assert!(matches!(result, Err(TableError::OverlappingPrefixes { .. })));
    }

    #[test]
    fn test_identical_prefixes_rejected() {
        let result = PrefixTable::new(vec![
            ResourceType::new("a", "as", "as", &["x_"]),
            ResourceType::new("b", "bs", "bs", &["x_"]),
        ]);

        assert!(matches!(result, Err(TableError::OverlappingPrefixes { .. })));
    }

    #[test]
    fn test_same_type_prefixes_may_nest() {
        let table = PrefixTable::new(vec![
            ResourceType::new("file", "files", "files", &["file_", "file_link_"]),
        ])
        .unwrap();

        assert_eq!(table.match_id("file_link_9").unwrap().name, "file");
    }

    #[test]
    fn test_longest_prefix_checked_first() {
        let table = PrefixTable::new(vec![
            ResourceType::new("short", "shorts", "shorts", &["ab_", "a_"]),
            ResourceType::new("long", "longs", "longs", &["abc_"]),
        ])
        .unwrap();

        assert_eq!(table.lookup[0].0, "abc_");
        // Equal lengths keep declaration order.
        assert_eq!(table.lookup[1].0, "ab_");
        assert_eq!(table.lookup[2].0, "a_");
        assert_eq!(table.match_id("abc_1").unwrap().name, "long");
    }

    #[test]
    fn test_invalid_declarations_rejected() {
        assert!(matches!(
            PrefixTable::new(vec![ResourceType::new("a", "as", "as", &[])]),
            Err(TableError::MissingPrefixes { .. })
        ));
        assert!(matches!(
            PrefixTable::new(vec![ResourceType::new("a", "as", "as", &[""])]),
            Err(TableError::EmptyPrefix { .. })
        ));
        assert!(matches!(
            PrefixTable::new(vec![
                ResourceType::new("a", "as", "as", &["a_"]),
                ResourceType::new("b", "as", "bs", &["b_"]),
            ]),
            Err(TableError::DuplicateType { .. })
        ));
    }
}
