//! Configuration management
//!
//! Settings live in `settings.json` inside the tally directory:
//! ```json
//! {
//!   "import": {
//!     "priceBands": { "mediumFrom": "50.00", "highFrom": "200.00" },
//!     "extraAliases": { "unit_cost": ["custo do produto"] }
//!   },
//!   "identities": {
//!     "ana": { "role": "client", "companies": [3] }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::domain::{CanonicalField, CompanyId, Role};
use crate::services::header::normalize_header;
use crate::services::PriceBands;

/// Built-in header aliases, folded with `normalize_header` when the
/// mapping is built. Portuguese marketplace labels first, then English.
const BUILTIN_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::SaleDate,
        &[
            "data",
            "data da venda",
            "data de criação do pedido",
            "data do pedido",
            "date",
            "sale date",
            "order date",
        ],
    ),
    (
        CanonicalField::ProductSku,
        &[
            "sku",
            "código",
            "código do produto",
            "nº de referência do sku principal",
            "product sku",
        ],
    ),
    (
        CanonicalField::Quantity,
        &["qtde", "qtd", "quantidade", "unidades", "quantity", "qty", "units"],
    ),
    (
        CanonicalField::UnitPrice,
        &[
            "preço",
            "preço unitário",
            "preço unitário de venda do anúncio (BRL)",
            "preço acordado",
            "valor unitário",
            "price",
            "unit price",
        ],
    ),
    (
        CanonicalField::UnitCost,
        &["custo", "custo unitário", "custo do produto", "cost", "unit cost"],
    ),
    (
        CanonicalField::OrderNumber,
        &[
            "n.º de venda",
            "id do pedido",
            "número do pedido",
            "pedido",
            "order id",
            "order number",
        ],
    ),
    (
        CanonicalField::ProductName,
        &[
            "produto",
            "nome do produto",
            "título do anúncio",
            "descrição",
            "product",
            "product name",
        ],
    ),
    (
        CanonicalField::OrderStatus,
        &["status", "descrição do status", "status do pedido", "order status"],
    ),
    (CanonicalField::BuyerState, &["estado", "uf", "state"]),
    (CanonicalField::BuyerCity, &["cidade", "city"]),
];

/// Header alias table: normalized alias -> canonical field.
///
/// Immutable once built; imports share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    aliases: HashMap<String, CanonicalField>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        let mut aliases = HashMap::new();
        for (field, names) in BUILTIN_ALIASES {
            // Canonical names always resolve to themselves
            aliases.insert(field.as_str().to_string(), *field);
            for name in names.iter() {
                let previous = aliases.insert(normalize_header(name), *field);
                debug_assert!(
                    previous.is_none() || previous == Some(*field),
                    "built-in alias '{}' maps to two fields",
                    name
                );
            }
        }
        Self { aliases }
    }
}

impl ColumnMapping {
    /// Extend the built-in table. An alias that already belongs to another
    /// field is a configuration error.
    pub fn with_extra_aliases(
        mut self,
        extra: &BTreeMap<CanonicalField, Vec<String>>,
    ) -> crate::domain::result::Result<Self> {
        for (field, names) in extra {
            for name in names {
                let token = normalize_header(name);
                if token.is_empty() {
                    return Err(Error::config(format!("blank alias for '{}'", field)));
                }
                match self.aliases.get(&token) {
                    Some(existing) if existing != field => {
                        return Err(Error::config(format!(
                            "alias '{}' is already used for '{}'",
                            name, existing
                        )));
                    }
                    _ => {
                        self.aliases.insert(token, *field);
                    }
                }
            }
        }
        Ok(self)
    }

    /// Look up an already normalized header token
    pub fn field_for(&self, normalized: &str) -> Option<CanonicalField> {
        self.aliases.get(normalized).copied()
    }
}

/// Raw settings.json structure
///
/// Keys this crate doesn't manage are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    identities: BTreeMap<String, IdentityEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default)]
    price_bands: Option<PriceBandSettings>,
    #[serde(default)]
    extra_aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceBandSettings {
    medium_from: Decimal,
    high_from: Decimal,
}

/// One configured uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub role: Role,
    #[serde(default)]
    pub companies: BTreeSet<CompanyId>,
}

/// Tally configuration (typed view of settings.json)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub price_bands: PriceBands,
    pub extra_aliases: BTreeMap<CanonicalField, Vec<String>>,
    pub identities: BTreeMap<String, IdentityEntry>,
}

impl Config {
    /// Load config from the tally directory
    ///
    /// Price band thresholds can be overridden with TALLY_PRICE_MEDIUM_FROM
    /// and TALLY_PRICE_HIGH_FROM.
    pub fn load(tally_dir: &Path) -> Result<Self> {
        let settings_path = tally_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("{}: {}", settings_path.display(), e)))?
        } else {
            SettingsFile::default()
        };

        let price_bands = apply_price_overrides(
            raw.import.price_bands,
            std::env::var("TALLY_PRICE_MEDIUM_FROM").ok().as_deref(),
            std::env::var("TALLY_PRICE_HIGH_FROM").ok().as_deref(),
        )?;

        let mut extra_aliases = BTreeMap::new();
        for (name, aliases) in &raw.import.extra_aliases {
            let field = CanonicalField::from_name(name)
                .ok_or_else(|| Error::config(format!("unknown field '{}' in extraAliases", name)))?;
            extra_aliases.insert(field, aliases.clone());
        }

        Ok(Self {
            price_bands,
            extra_aliases,
            identities: raw.identities,
        })
    }

    /// Alias table with configured extras applied
    pub fn column_mapping(&self) -> Result<ColumnMapping> {
        Ok(ColumnMapping::default().with_extra_aliases(&self.extra_aliases)?)
    }
}

fn apply_price_overrides(
    settings: Option<PriceBandSettings>,
    medium_from: Option<&str>,
    high_from: Option<&str>,
) -> Result<PriceBands> {
    let defaults = PriceBands::default();
    let (mut medium, mut high) = settings
        .map(|s| (s.medium_from, s.high_from))
        .unwrap_or((defaults.medium_from(), defaults.high_from()));

    if let Some(value) = medium_from {
        medium = parse_threshold("TALLY_PRICE_MEDIUM_FROM", value)?;
    }
    if let Some(value) = high_from {
        high = parse_threshold("TALLY_PRICE_HIGH_FROM", value)?;
    }

    Ok(PriceBands::new(medium, high)?)
}

fn parse_threshold(name: &str, value: &str) -> std::result::Result<Decimal, Error> {
    Decimal::from_str(value.trim())
        .map_err(|e| Error::config(format!("{} is not a decimal ('{}'): {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_mapping_resolves_portuguese_and_english_headers() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.field_for("qtde"), Some(CanonicalField::Quantity));
        assert_eq!(mapping.field_for("preco"), Some(CanonicalField::UnitPrice));
        assert_eq!(mapping.field_for("unit_cost"), Some(CanonicalField::UnitCost));
        assert_eq!(
            mapping.field_for("preco_unitario_de_venda_do_anuncio_brl"),
            Some(CanonicalField::UnitPrice)
        );
        assert_eq!(mapping.field_for("comprador"), None);
        assert_eq!(mapping.field_for("cidade"), Some(CanonicalField::BuyerCity));
    }

    #[test]
    fn test_extra_aliases_extend_mapping() {
        let mut extra = BTreeMap::new();
        extra.insert(CanonicalField::UnitCost, vec!["Custo Médio".to_string()]);
        let mapping = ColumnMapping::default().with_extra_aliases(&extra).unwrap();
        assert_eq!(mapping.field_for("custo_medio"), Some(CanonicalField::UnitCost));
    }

    #[test]
    fn test_extra_alias_colliding_with_other_field_is_rejected() {
        let mut extra = BTreeMap::new();
        extra.insert(CanonicalField::UnitCost, vec!["Preço".to_string()]);
        let err = ColumnMapping::default().with_extra_aliases(&extra).unwrap_err();
        assert!(err.to_string().contains("already used"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.identities.is_empty());
        assert!(config.extra_aliases.is_empty());
    }

    #[test]
    fn test_load_settings_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "import": {
                    "priceBands": { "mediumFrom": "40.00", "highFrom": "150.00" },
                    "extraAliases": { "unit_cost": ["custo medio"] }
                },
                "identities": {
                    "ana": { "role": "cliente", "companies": [3] },
                    "gil": { "role": "manager", "companies": [3, 4] }
                }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.identities["ana"].role, Role::Client);
        assert_eq!(config.identities["gil"].companies.len(), 2);
        assert_eq!(config.extra_aliases[&CanonicalField::UnitCost], vec!["custo medio"]);
        let mapping = config.column_mapping().unwrap();
        assert_eq!(mapping.field_for("custo_medio"), Some(CanonicalField::UnitCost));
    }

    #[test]
    fn test_unknown_alias_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "import": { "extraAliases": { "discount": ["desconto"] } } }"#,
        )
        .unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_ignores_unmanaged_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "theme": "dark", "import": { "locale": "pt-BR" } }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.price_bands, PriceBands::default());
    }

    #[test]
    fn test_price_overrides() {
        let bands = apply_price_overrides(None, Some("10"), None).unwrap();
        assert_eq!(bands.medium_from(), d("10"));
        assert_eq!(bands.high_from(), d("200.00"));

        assert!(apply_price_overrides(None, Some("abc"), None).is_err());
        assert!(apply_price_overrides(None, Some("500"), None).is_err());
    }
}
