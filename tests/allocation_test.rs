use chrono::FixedOffset;
use salesgrid::domain::{CostTable, Decimal, Order, Payment, Row, Shipment};
use salesgrid::engine::{AllocationItem, OrderRowMapper, PivotMode, ShippingAllocator};
use salesgrid::{ShippingRules, SplitPolicy};
use serde_json::json;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn order(id: i64, price: &str, pack_id: Option<i64>) -> Order {
    serde_json::from_value(json!({
        "id": id,
        "status": "paid",
        "date_created": "2024-05-01T12:00:00.000-03:00",
        "total_amount": price,
        "pack_id": pack_id,
        "order_items": [{
            "item": {"id": format!("MLA{}", id), "title": "Termo"},
            "quantity": 1,
            "unit_price": price,
            "full_unit_price": price
        }]
    }))
    .unwrap()
}

fn shipment(id: Option<i64>, list_cost: &str, paid_by: &str) -> Shipment {
    serde_json::from_value(json!({
        "id": id,
        "receiver_cost": 0,
        "shipping_option": {"list_cost": list_cost, "cost_components": {"paid_by": paid_by}}
    }))
    .unwrap()
}

fn rules(split: SplitPolicy) -> ShippingRules {
    ShippingRules {
        split,
        ..Default::default()
    }
}

fn allocate(
    rules: ShippingRules,
    batch: &[(Order, Option<Shipment>, Vec<Payment>)],
) -> Vec<Row> {
    let mapper = OrderRowMapper::new(
        rules,
        PivotMode::Created,
        FixedOffset::west_opt(3 * 3600).unwrap(),
    );
    let costs = CostTable::default();
    let items = batch
        .iter()
        .map(|(order, shipment, payments)| AllocationItem {
            order,
            shipment: shipment.as_ref(),
            row: mapper.map_order(order, payments, shipment.as_ref(), &costs, None),
        })
        .collect();
    ShippingAllocator::new(rules).allocate(items)
}

fn shipping(rows: &[Row]) -> Vec<Decimal> {
    rows.iter().map(|r| r.shipping).collect()
}

fn shared(prices: &[&str], list_cost: &str) -> Vec<(Order, Option<Shipment>, Vec<Payment>)> {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            (
                order(i as i64 + 1, price, Some(77)),
                Some(shipment(Some(900), list_cost, "seller")),
                vec![],
            )
        })
        .collect()
}

#[test]
fn test_by_price_split_prorates_and_skips_free_rows() {
    let rows = allocate(
        rules(SplitPolicy::ByPrice),
        &shared(&["40000", "80000", "20000"], "3000"),
    );
    assert_eq!(shipping(&rows), vec![d("1000"), d("2000"), Decimal::zero()]);
    assert_eq!(rows[0].net, d("39000"));
    assert_eq!(rows[1].net, d("78000"));
    assert_eq!(rows[2].net, d("20000"));
}

#[test]
fn test_by_price_double_price_gets_double_share() {
    let rows = allocate(
        rules(SplitPolicy::ByPrice),
        &shared(&["35000", "70000", "35000"], "1000"),
    );
    let shares = shipping(&rows);
    assert_eq!(shares.iter().copied().sum::<Decimal>(), d("1000"));
    let diff = (shares[1] - shares[0] * Decimal::from_i64(2)).abs();
    assert!(diff <= d("0.01"), "shares {:?}", shares);
}

#[test]
fn test_by_price_prefers_interest_free_price() {
    let mut batch = shared(&["40000", "40000"], "900");
    let settled = |amount: &str| {
        vec![Payment {
            id: Some(1),
            status: Some("approved".to_string()),
            transaction_amount: Some(d(amount)),
            ..Default::default()
        }]
    };
    batch[0].2 = settled("100000");
    batch[1].2 = settled("50000");
    let rows = allocate(rules(SplitPolicy::ByPrice), &batch);
    assert_eq!(shipping(&rows), vec![d("600"), d("300")]);
}

#[test]
fn test_even_split_assigns_remainder_cents_first() {
    let rows = allocate(
        rules(SplitPolicy::Even),
        &shared(&["40000", "40000", "40000"], "10"),
    );
    assert_eq!(shipping(&rows), vec![d("3.34"), d("3.33"), d("3.33")]);
}

#[test]
fn test_first_split_charges_first_eligible_row() {
    let rows = allocate(
        rules(SplitPolicy::First),
        &shared(&["20000", "40000", "50000"], "2500"),
    );
    assert_eq!(shipping(&rows), vec![Decimal::zero(), d("2500"), Decimal::zero()]);
}

#[test]
fn test_group_total_is_preserved_for_every_policy() {
    for policy in [SplitPolicy::First, SplitPolicy::Even, SplitPolicy::ByPrice] {
        let rows = allocate(
            rules(policy),
            &shared(&["33333.33", "47000.01", "99999.99", "35000"], "4321.07"),
        );
        let total: Decimal = shipping(&rows).into_iter().sum();
        assert_eq!(total, d("4321.07"), "policy {}", policy);
    }
}

#[test]
fn test_all_free_group_absorbs_shipping() {
    let rows = allocate(
        rules(SplitPolicy::ByPrice),
        &shared(&["10000", "20000"], "3000"),
    );
    assert_eq!(shipping(&rows), vec![Decimal::zero(), Decimal::zero()]);
}

#[test]
fn test_zero_total_group() {
    let rows = allocate(
        rules(SplitPolicy::Even),
        &shared(&["40000", "50000"], "0"),
    );
    assert_eq!(shipping(&rows), vec![Decimal::zero(), Decimal::zero()]);
}

#[test]
fn test_ungrouped_and_singleton_rows_use_threshold_only() {
    let batch = vec![
        // ungrouped, below threshold
        (order(1, "20000", None), Some(shipment(None, "3000", "seller")), vec![]),
        // ungrouped, above threshold
        (order(2, "40000", None), Some(shipment(None, "3000", "seller")), vec![]),
        // singleton group, above threshold
        (order(3, "40000", None), Some(shipment(Some(5), "2800", "seller")), vec![]),
    ];
    let rows = allocate(rules(SplitPolicy::ByPrice), &batch);
    assert_eq!(shipping(&rows), vec![Decimal::zero(), d("3000"), d("2800")]);
}

#[test]
fn test_threshold_equality_follows_inclusivity() {
    let batch = vec![(
        order(1, "33000", None),
        Some(shipment(None, "3000", "buyer")),
        vec![],
    )];

    let inclusive = allocate(rules(SplitPolicy::ByPrice), &batch);
    assert_eq!(inclusive[0].shipping, Decimal::zero());

    let exclusive = allocate(
        ShippingRules {
            inclusive: false,
            ..rules(SplitPolicy::ByPrice)
        },
        &batch,
    );
    assert_eq!(exclusive[0].shipping, d("3000"));
    assert_eq!(exclusive[0].net, d("30000"));
}

#[test]
fn test_rows_come_back_in_input_order() {
    let batch = vec![
        (order(10, "40000", Some(1)), None, vec![]),
        (order(11, "40000", None), None, vec![]),
        (order(12, "40000", Some(1)), None, vec![]),
    ];
    let rows = allocate(rules(SplitPolicy::Even), &batch);
    let ids: Vec<i64> = rows.iter().map(|r| r.sale_id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}
