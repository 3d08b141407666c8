//! Mercado Pago payments API: withheld taxes per payment.

use super::http::{build_client, get_json};
use super::{DataSourceError, TaxSource};
use crate::domain::Decimal;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MP_API_URL: &str = "https://api.mercadopago.com";

#[derive(Debug, Clone)]
pub struct MercadoPagoTaxSource {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoTaxSource {
    pub fn new(
        base_url: String,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self, DataSourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

#[async_trait]
impl TaxSource for MercadoPagoTaxSource {
    async fn payment_taxes(&self, payment_id: i64) -> Result<Decimal, DataSourceError> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let payment = get_json(&self.client, &url, Some(&self.access_token), &[]).await?;
        let taxes = sum_tax_charges(&payment);
        debug!("payment {} taxes={}", payment_id, taxes);
        Ok(taxes)
    }
}

/// Sum of `charges_details` entries of type `tax`.
///
/// Each charge contributes `amounts.original`, else `amounts.payer`, else
/// `amounts.collector`, else its flat `amount`.
pub fn sum_tax_charges(payment: &Value) -> Decimal {
    let Some(charges) = payment.get("charges_details").and_then(Value::as_array) else {
        return Decimal::zero();
    };
    charges
        .iter()
        .filter(|ch| ch.get("type").and_then(Value::as_str) == Some("tax"))
        .map(|ch| {
            let amounts = ch.get("amounts");
            let picked = ["original", "payer", "collector"]
                .iter()
                .filter_map(|k| amounts.and_then(|a| a.get(*k)))
                .find(|v| !v.is_null())
                .or_else(|| ch.get("amount"));
            picked.map(Decimal::to_number).unwrap_or_default()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sum_tax_charges_prefers_original_amount() {
        let payment = json!({
            "charges_details": [
                {"type": "tax", "amounts": {"original": 12.5, "payer": 99}},
                {"type": "tax", "amounts": {"payer": "3.25"}},
                {"type": "tax", "amount": 1},
                {"type": "fee", "amounts": {"original": 500}},
                {"type": "tax", "amounts": {"original": null, "collector": 2}}
            ]
        });
        assert_eq!(
            sum_tax_charges(&payment),
            Decimal::from_str_canonical("18.75").unwrap()
        );
    }

    #[test]
    fn test_sum_tax_charges_without_charges() {
        assert_eq!(sum_tax_charges(&json!({})), Decimal::zero());
        assert_eq!(sum_tax_charges(&json!({"charges_details": null})), Decimal::zero());
    }
}
