//! Unit cost table keyed by marketplace item id.

use super::{Decimal, OrderItem};
use std::collections::HashMap;

/// Zero-based column holding the unit cost in a raw cost sheet row
/// (column A is the item id, column M the cost).
pub const COST_COLUMN: usize = 12;

/// Immutable item id -> unit cost mapping, built once per batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostTable {
    costs: HashMap<String, Decimal>,
}

impl CostTable {
    pub fn new(costs: HashMap<String, Decimal>) -> Self {
        Self { costs }
    }

    pub fn get(&self, item_id: &str) -> Option<Decimal> {
        self.costs.get(item_id).copied()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.costs.contains_key(item_id)
    }

    /// Unit cost for a line item: item id first, then seller SKU, then variation id.
    pub fn unit_cost_for(&self, item: &OrderItem) -> Option<Decimal> {
        item.cost_keys().find_map(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Entries sorted by item id.
    pub fn sorted_entries(&self) -> Vec<(&str, Decimal)> {
        let mut entries: Vec<_> = self.costs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Build a cost table from raw sheet rows `[item_id, .., unit_cost]`.
///
/// Rows with an empty id or an unparsable cost are skipped; a later row for
/// the same id overrides an earlier one.
pub fn build_cost_table<R, S>(rows: impl IntoIterator<Item = R>) -> CostTable
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut costs = HashMap::new();
    for row in rows {
        let row = row.as_ref();
        let id = row.first().map(|s| s.as_ref().trim()).unwrap_or("");
        if id.is_empty() {
            continue;
        }
        let Some(cost) = row.get(COST_COLUMN).and_then(|raw| parse_cost_cell(raw.as_ref())) else {
            continue;
        };
        costs.insert(id.to_string(), cost);
    }
    CostTable::new(costs)
}

/// Steps of parsing one cost cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CostCellParse {
    pub raw: String,
    /// Text handed to the decimal parser.
    pub cleaned: String,
    pub value: Option<Decimal>,
}

/// Parse a locale-formatted cost such as `"$ 1.234,56"`.
///
/// Everything except digits, `,` and `-` is dropped, so thousands dots
/// vanish; the first comma becomes the decimal point. An empty result is
/// treated as absent.
pub fn parse_cost_cell(raw: &str) -> Option<Decimal> {
    inspect_cost_cell(raw).value
}

/// Like [`parse_cost_cell`], keeping the intermediate text.
pub fn inspect_cost_cell(raw: &str) -> CostCellParse {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-'))
        .collect::<String>()
        .replacen(',', ".", 1);
    let value = if cleaned.is_empty() {
        None
    } else {
        Decimal::from_str_canonical(&cleaned).ok()
    };
    CostCellParse {
        raw: raw.to_string(),
        cleaned,
        value,
    }
}
