//! Header normalization and column resolution

use std::collections::BTreeMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::ColumnMapping;
use crate::domain::{CanonicalField, FileFailure, HeaderProblem, SourceMarketplace};

/// Fold a header (or alias) into its matching token.
///
/// `" Preço Unitário (R$) "` becomes `"preco_unitario_r"`. Applying the
/// function twice gives the same result as applying it once.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Header positions resolved against the canonical schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    columns: Vec<Option<CanonicalField>>,
    positions: BTreeMap<CanonicalField, usize>,
}

impl HeaderMap {
    /// Resolve a header row.
    ///
    /// A canonical field claimed by two columns is reported as soon as the
    /// second one is seen; missing required fields are reported afterwards,
    /// in canonical order.
    pub fn resolve(cells: &[String], mapping: &ColumnMapping) -> Result<Self, FileFailure> {
        let mut columns = Vec::with_capacity(cells.len());
        let mut positions = BTreeMap::new();

        for (index, cell) in cells.iter().enumerate() {
            let field = mapping.field_for(&normalize_header(cell));
            if let Some(field) = field {
                if positions.insert(field, index).is_some() {
                    return Err(FileFailure::HeaderResolution {
                        field,
                        problem: HeaderProblem::Duplicate,
                    });
                }
            }
            columns.push(field);
        }

        if let Some(field) = CanonicalField::REQUIRED
            .into_iter()
            .find(|f| !positions.contains_key(f))
        {
            return Err(FileFailure::HeaderResolution {
                field,
                problem: HeaderProblem::Missing,
            });
        }

        Ok(Self { columns, positions })
    }

    /// Number of header cells
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self, field: CanonicalField) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    pub fn field_at(&self, index: usize) -> Option<CanonicalField> {
        self.columns.get(index).copied().flatten()
    }

    /// Header texts that matched no canonical field (blank headers skipped)
    pub fn unmapped_columns(&self, cells: &[String]) -> Vec<String> {
        cells
            .iter()
            .zip(&self.columns)
            .filter(|(cell, field)| field.is_none() && !cell.trim().is_empty())
            .map(|(cell, _)| cell.trim().to_string())
            .collect()
    }
}

const MERCADO_LIVRE_MARKERS: [&str; 3] = ["n_o_de_venda", "tarifa_de_venda_e_impostos", "de_anuncio"];
const SHOPEE_MARKERS: [&str; 3] = [
    "id_do_pedido",
    "no_de_referencia_do_sku_principal",
    "status_do_pedido",
];

/// Guess which marketplace produced the export from its header row.
/// Two matching marker columns are needed.
pub fn detect_source(cells: &[String]) -> SourceMarketplace {
    let normalized: Vec<String> = cells.iter().map(|c| normalize_header(c)).collect();
    let hits = |markers: &[&str]| {
        markers
            .iter()
            .filter(|m| normalized.iter().any(|h| h.starts_with(*m)))
            .count()
    };

    if hits(&MERCADO_LIVRE_MARKERS) >= 2 {
        SourceMarketplace::MercadoLivre
    } else if hits(&SHOPEE_MARKERS) >= 2 {
        SourceMarketplace::Shopee
    } else {
        SourceMarketplace::Unknown
    }
}
