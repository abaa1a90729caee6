//! Canonical sale schema fields

use std::fmt;

use serde::{Deserialize, Serialize};

/// A target attribute of the normalized sale schema.
///
/// The first five are required in every import; the rest are carried
/// through when a column maps to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    SaleDate,
    ProductSku,
    Quantity,
    UnitPrice,
    UnitCost,
    OrderNumber,
    ProductName,
    OrderStatus,
    BuyerState,
    BuyerCity,
}

impl CanonicalField {
    /// Required fields, in the order rows are validated
    pub const REQUIRED: [CanonicalField; 5] = [
        CanonicalField::SaleDate,
        CanonicalField::ProductSku,
        CanonicalField::Quantity,
        CanonicalField::UnitPrice,
        CanonicalField::UnitCost,
    ];

    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::SaleDate,
        CanonicalField::ProductSku,
        CanonicalField::Quantity,
        CanonicalField::UnitPrice,
        CanonicalField::UnitCost,
        CanonicalField::OrderNumber,
        CanonicalField::ProductName,
        CanonicalField::OrderStatus,
        CanonicalField::BuyerState,
        CanonicalField::BuyerCity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::SaleDate => "sale_date",
            CanonicalField::ProductSku => "product_sku",
            CanonicalField::Quantity => "quantity",
            CanonicalField::UnitPrice => "unit_price",
            CanonicalField::UnitCost => "unit_cost",
            CanonicalField::OrderNumber => "order_number",
            CanonicalField::ProductName => "product_name",
            CanonicalField::OrderStatus => "order_status",
            CanonicalField::BuyerState => "buyer_state",
            CanonicalField::BuyerCity => "buyer_city",
        }
    }

    /// Look up a field by its snake_case name (as used in settings.json)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_every_field() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(CanonicalField::from_name("price"), None);
    }

    #[test]
    fn test_required_fields() {
        assert!(CanonicalField::UnitCost.is_required());
        assert!(!CanonicalField::BuyerCity.is_required());
    }
}
