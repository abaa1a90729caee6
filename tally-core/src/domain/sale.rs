//! Sale record domain model
//!
//! A sale moves through staged types: `ParsedSale` (typed row), then
//! `SaleRecord` once derived metrics and attribution are attached. There is
//! no partially populated record; rows that fail validation become
//! `RowError`s instead.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::CompanyId;

/// Normalized order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Map a folded marketplace status label (see `normalize_header`).
    /// Unknown labels count as paid.
    pub fn from_label(folded: &str) -> Self {
        match folded {
            "entregue" | "concluido" | "delivered" | "completed" => OrderStatus::Delivered,
            "enviado" | "a_caminho" | "em_andamento" | "shipped" | "in_transit" => {
                OrderStatus::Shipped
            }
            "cancelado" | "pacote_cancelado_pelo_mercado_livre" | "cancelled" | "canceled" => {
                OrderStatus::Cancelled
            }
            _ => OrderStatus::Paid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// A fully typed, validated sale row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSale {
    /// Source line number
    pub line: u64,
    pub sale_date: NaiveDate,
    pub product_sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    /// Falls back to the SKU when the export has no name column
    pub product_name: String,
    pub order_number: Option<String>,
    pub order_status: OrderStatus,
    pub buyer_state: Option<String>,
    pub buyer_city: Option<String>,
}

/// Price classification attached at ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBand {
    Low,
    Medium,
    High,
}

impl PriceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceBand::Low => "low",
            PriceBand::Medium => "medium",
            PriceBand::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(PriceBand::Low),
            "medium" => Some(PriceBand::Medium),
            "high" => Some(PriceBand::High),
            _ => None,
        }
    }
}

/// Metrics computed once per record so reads never recompute them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// `None` when the unit price is zero
    pub margin: Option<Decimal>,
    pub profit: Decimal,
    pub price_band: PriceBand,
}

/// Company and uploader a batch belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub company_id: CompanyId,
    pub uploaded_by: String,
}

/// An accepted, enriched and attributed sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub sale: ParsedSale,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    #[serde(flatten)]
    pub attribution: Attribution,
}

impl SaleRecord {
    pub fn new(
        batch_id: Uuid,
        sale: ParsedSale,
        metrics: DerivedMetrics,
        attribution: Attribution,
    ) -> Self {
        Self {
            batch_id,
            sale,
            metrics,
            attribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(OrderStatus::from_label("a_caminho"), OrderStatus::Shipped);
        assert_eq!(OrderStatus::from_label("concluido"), OrderStatus::Delivered);
        assert_eq!(
            OrderStatus::from_label("pacote_cancelado_pelo_mercado_livre"),
            OrderStatus::Cancelled
        );
        assert_eq!(OrderStatus::from_label("pronto_para_envio"), OrderStatus::Paid);
        assert_eq!(OrderStatus::from_label(""), OrderStatus::Paid);
    }

    #[test]
    fn test_price_band_parse() {
        for band in [PriceBand::Low, PriceBand::Medium, PriceBand::High] {
            assert_eq!(PriceBand::parse(band.as_str()), Some(band));
        }
        assert_eq!(PriceBand::parse("Médio"), None);
    }
}
