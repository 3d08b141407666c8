//! Output row and its fixed column schema.
//!
//! Column order is part of the external contract: the JSON grid and the CSV
//! export both index cells by [`Column`], and reordering is a breaking change.

use super::{Decimal, OrderId};
use serde::Serialize;

/// Output columns in their authoritative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    SaleId,
    Date,
    Title,
    FinalPrice,
    Net,
    Cost,
    Margin,
    BasePrice,
    DiscountPct,
    FinalPriceNoInterest,
    Shipping,
    Tax,
    SaleFee,
    Installments,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::SaleId => "ID DE VENTA",
            Column::Date => "FECHA",
            Column::Title => "TITULO",
            Column::FinalPrice => "Precio Final",
            Column::Net => "NETO",
            Column::Cost => "COSTO",
            Column::Margin => "GANANCIA",
            Column::BasePrice => "PRECIO BASE",
            Column::DiscountPct => "% DESCUENTO",
            Column::FinalPriceNoInterest => "Precio Final sin interés",
            Column::Shipping => "ENVIO",
            Column::Tax => "IMPUESTO",
            Column::SaleFee => "CARGO X VENTA",
            Column::Installments => "CUOTAS",
        }
    }
}

const ALL_COLUMNS: [Column; 14] = [
    Column::SaleId,
    Column::Date,
    Column::Title,
    Column::FinalPrice,
    Column::Net,
    Column::Cost,
    Column::Margin,
    Column::BasePrice,
    Column::DiscountPct,
    Column::FinalPriceNoInterest,
    Column::Shipping,
    Column::Tax,
    Column::SaleFee,
    Column::Installments,
];

/// Column layout of an export: 13 columns, or 14 with the interest-free price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowSchema {
    pub interest_free_column: bool,
}

impl RowSchema {
    pub fn new(interest_free_column: bool) -> Self {
        Self {
            interest_free_column,
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        ALL_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.interest_free_column || *c != Column::FinalPriceNoInterest)
            .collect()
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(Column::header).collect()
    }

    /// Position of a column in this layout.
    pub fn index_of(&self, column: Column) -> Option<usize> {
        self.columns().iter().position(|c| *c == column)
    }

    pub fn cells(&self, row: &Row) -> Vec<Cell> {
        self.columns().into_iter().map(|c| row.cell(c)).collect()
    }
}

/// A scalar grid value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Number(Decimal),
    Text(String),
    Null,
}

impl Cell {
    /// Text used in CSV output; null becomes an empty string.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Number(v) => v.to_canonical_string(),
            Cell::Text(v) => v.clone(),
            Cell::Null => String::new(),
        }
    }
}

/// Financial summary of one order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub sale_id: OrderId,
    pub date: String,
    pub title: String,
    pub final_price: Decimal,
    pub net: Decimal,
    pub cost: Decimal,
    pub margin_pct: Decimal,
    pub base_price: Decimal,
    pub discount_pct: Decimal,
    pub final_price_no_interest: Option<Decimal>,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub sale_fee: Decimal,
    pub installments: i64,
}

impl Row {
    pub fn cell(&self, column: Column) -> Cell {
        match column {
            Column::SaleId => Cell::Int(self.sale_id),
            Column::Date => Cell::Text(self.date.clone()),
            Column::Title => Cell::Text(self.title.clone()),
            Column::FinalPrice => Cell::Number(self.final_price),
            Column::Net => Cell::Number(self.net),
            Column::Cost => Cell::Number(self.cost),
            Column::Margin => Cell::Number(self.margin_pct),
            Column::BasePrice => Cell::Number(self.base_price),
            Column::DiscountPct => Cell::Number(self.discount_pct),
            Column::FinalPriceNoInterest => match self.final_price_no_interest {
                Some(v) => Cell::Number(v),
                None => Cell::Null,
            },
            Column::Shipping => Cell::Number(self.shipping),
            Column::Tax => Cell::Number(self.tax),
            Column::SaleFee => Cell::Number(self.sale_fee),
            Column::Installments => Cell::Int(self.installments),
        }
    }

    /// `final - (shipping + tax + fee)`, rounded to cents.
    pub fn compute_net(&self) -> Decimal {
        (self.final_price - (self.shipping + self.tax + self.sale_fee)).round2()
    }

    /// Margin over cost as a percentage; 0 when cost is not positive.
    pub fn compute_margin(&self) -> Decimal {
        if !self.cost.is_positive() {
            return Decimal::zero();
        }
        ((self.net - self.cost) * Decimal::hundred())
            .checked_div(self.cost)
            .map(|m| m.round1())
            .unwrap_or_default()
    }

    /// Refresh NETO and GANANCIA after any of their inputs changed.
    pub fn recompute_derived(&mut self) {
        self.net = self.compute_net();
        self.margin_pct = self.compute_margin();
    }

    /// Copy of this row with a different shipping cost and refreshed derived columns.
    pub fn with_shipping(&self, shipping: Decimal) -> Row {
        let mut row = self.clone();
        row.shipping = shipping.round2();
        row.recompute_derived();
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn sample_row() -> Row {
        let mut row = Row {
            sale_id: 42,
            date: "2024-05-01 10:00:00".to_string(),
            title: "Mate".to_string(),
            final_price: d("1000"),
            cost: d("500"),
            shipping: d("100"),
            tax: d("20"),
            sale_fee: d("130"),
            installments: 3,
            ..Default::default()
        };
        row.recompute_derived();
        row
    }

    #[test]
    fn test_schema_headers_default_has_13_columns() {
        let schema = RowSchema::default();
        let headers = schema.headers();
        assert_eq!(headers.len(), 13);
        assert_eq!(headers[0], "ID DE VENTA");
        assert_eq!(headers[9], "ENVIO");
        assert_eq!(headers[12], "CUOTAS");
    }

    #[test]
    fn test_schema_with_interest_free_column() {
        let schema = RowSchema::new(true);
        assert_eq!(schema.headers().len(), 14);
        assert_eq!(schema.index_of(Column::FinalPriceNoInterest), Some(9));
        assert_eq!(schema.index_of(Column::Shipping), Some(10));
        assert_eq!(RowSchema::default().index_of(Column::FinalPriceNoInterest), None);
    }

    #[test]
    fn test_net_and_margin() {
        let row = sample_row();
        assert_eq!(row.net, d("750"));
        assert_eq!(row.margin_pct, d("50"));
    }

    #[test]
    fn test_margin_zero_without_cost() {
        let mut row = sample_row();
        row.cost = Decimal::zero();
        row.recompute_derived();
        assert_eq!(row.margin_pct, Decimal::zero());
    }

    #[test]
    fn test_with_shipping_recomputes() {
        let row = sample_row().with_shipping(d("0"));
        assert_eq!(row.shipping, Decimal::zero());
        assert_eq!(row.net, d("850"));
        assert_eq!(row.margin_pct, d("70"));
    }

    #[test]
    fn test_cells_follow_schema() {
        let row = sample_row();
        let cells = RowSchema::default().cells(&row);
        assert_eq!(cells[0], Cell::Int(42));
        assert_eq!(cells[4], Cell::Number(d("750")));
        assert_eq!(cells[12], Cell::Int(3));

        let json = serde_json::to_value(&cells).unwrap();
        assert_eq!(json[0], serde_json::json!(42));
        assert_eq!(json[2], serde_json::json!("Mate"));
    }

    #[test]
    fn test_null_cell_text() {
        let row = sample_row();
        let cells = RowSchema::new(true).cells(&row);
        assert_eq!(cells[9], Cell::Null);
        assert_eq!(cells[9].to_text(), "");
    }
}
