use super::*;

fn record(fields: &[(&str, &str)]) -> RawRecord {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn valid(order_type: &str, quantity: &str) -> RawRecord {
    record(&[
        ("invoice_id", "inv-1"),
        ("country", "US"),
        ("timestamp", "60000"),
        ("order_type", order_type),
        ("sku", "SKU-1"),
        ("title", "Mug"),
        ("unit_price", "5.00"),
        ("quantity", quantity),
    ])
}

// ── normalize ─────────────────────────────────────────────────────────────

#[test]
fn test_new_order_is_credit() {
    let e = normalize(&valid("NEW", "2")).unwrap();
    assert_eq!(e.order_type, OrderType::New);
    assert_eq!(e.quantity, 2);
    assert_eq!(e.total_cost, Decimal::new(1000, 2));
    assert_eq!(e.timestamp, 60_000);
}

#[test]
fn test_return_is_debit() {
    let e = normalize(&valid("RETURN", "1")).unwrap();
    assert_eq!(e.quantity, -1);
    assert_eq!(e.total_cost, Decimal::new(-500, 2));
}

#[test]
fn test_cost_sign_follows_order_type_for_any_raw_sign() {
    for qty in ["1", "-1", "7", "-7"] {
        let new = normalize(&valid("NEW", qty)).unwrap();
        assert!(new.total_cost > Decimal::ZERO, "NEW qty {qty}");
        let ret = normalize(&valid("RETURN", qty)).unwrap();
        assert!(ret.total_cost < Decimal::ZERO, "RETURN qty {qty}");
    }
}

#[test]
fn test_legacy_order_type_and_case() {
    assert_eq!(normalize(&valid("ORDER", "1")).unwrap().order_type, OrderType::New);
    assert_eq!(normalize(&valid("return", "1")).unwrap().order_type, OrderType::Return);
}

#[test]
fn test_unknown_order_type() {
    let err = normalize(&valid("EXCHANGE", "1")).unwrap_err();
    assert_eq!(err, NormalizeError::UnknownOrderType("EXCHANGE".to_string()));
}

#[test]
fn test_zero_quantity_is_malformed() {
    assert!(matches!(
        normalize(&valid("NEW", "0")),
        Err(NormalizeError::MalformedRecord(_))
    ));
}

#[test]
fn test_non_numeric_fields_are_malformed() {
    assert!(matches!(
        normalize(&valid("NEW", "two")),
        Err(NormalizeError::MalformedRecord(_))
    ));

    let mut rec = valid("NEW", "1");
    rec.insert("unit_price".into(), "cheap".into());
    assert!(matches!(normalize(&rec), Err(NormalizeError::MalformedRecord(_))));
}

#[test]
fn test_negative_price_is_malformed() {
    let mut rec = valid("NEW", "1");
    rec.insert("unit_price".into(), "-1.50".into());
    assert!(matches!(normalize(&rec), Err(NormalizeError::MalformedRecord(_))));
}

#[test]
fn test_cost_beyond_decimal_range_is_malformed() {
    let mut rec = valid("NEW", "2");
    rec.insert("unit_price".into(), "79228162514264337593543950335".into());
    assert!(matches!(normalize(&rec), Err(NormalizeError::MalformedRecord(_))));
}

#[test]
fn test_missing_country_is_malformed() {
    let mut rec = valid("NEW", "1");
    rec.remove("country");
    let err = normalize(&rec).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::MalformedRecord("missing field `country`".to_string())
    );
}

#[test]
fn test_aliases_accepted() {
    let rec = record(&[
        ("invoice_no", "154132541653705"),
        ("country", "United Kingdom"),
        ("timestamp", "2020-11-20 05:55:31"),
        ("type", "ORDER"),
        ("SKU", "21485"),
        ("title", "RETROSPOT HEART HOT WATER BOTTLE"),
        ("unit_price", "4.95"),
        ("quantity", "6"),
    ]);
    let e = normalize(&rec).unwrap();
    assert_eq!(e.invoice_id, "154132541653705");
    assert_eq!(e.sku, "21485");
    assert_eq!(e.total_cost, Decimal::new(2970, 2));
}

// ── timestamps ────────────────────────────────────────────────────────────

#[test]
fn test_timestamp_formats() {
    assert_eq!(parse_timestamp("600000").unwrap(), 600_000);
    assert_eq!(parse_timestamp("1970-01-01T00:10:00Z").unwrap(), 600_000);
    assert_eq!(parse_timestamp("1970-01-01T01:10:00+01:00").unwrap(), 600_000);
    assert_eq!(parse_timestamp("1970-01-01 00:10:00").unwrap(), 600_000);
    assert_eq!(parse_timestamp("1970-01-01 00:10:00.250").unwrap(), 600_250);
    assert!(parse_timestamp("yesterday").is_err());
}

#[test]
fn test_epoch_outside_calendar_range_is_malformed() {
    for raw in ["9223372036854775000", "-9223372036854775000"] {
        assert!(matches!(
            parse_timestamp(raw),
            Err(NormalizeError::MalformedRecord(_))
        ));
    }
    let mut rec = valid("NEW", "1");
    rec.insert("timestamp".into(), "9223372036854775000".into());
    assert!(normalize(&rec).is_err());
}

// ── decode_payload ────────────────────────────────────────────────────────

#[test]
fn test_decode_flat_object() {
    let payload = br#"{"invoice_id":"a","country":"US","timestamp":1000,"order_type":"NEW","sku":"s","title":"t","unit_price":5.0,"quantity":2}"#;
    let records = decode_payload(payload).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["timestamp"], "1000");
    assert_eq!(records[0]["quantity"], "2");
    let e = normalize(&records[0]).unwrap();
    assert_eq!(e.total_cost, Decimal::new(100, 1));
}

#[test]
fn test_decode_invoice_with_items_fans_out() {
    let payload = br#"{
        "invoice_no": 154132541653705,
        "country": "United Kingdom",
        "timestamp": "2020-11-20 05:55:31",
        "type": "ORDER",
        "items": [
            {"SKU": "21485", "title": "HOT WATER BOTTLE", "unit_price": 4.95, "quantity": 6},
            {"SKU": "22457", "title": "SLATE TILE", "unit_price": 2.1, "quantity": 1}
        ]
    }"#;
    let records = decode_payload(payload).unwrap();
    assert_eq!(records.len(), 2);
    let events: Vec<_> = records.iter().map(|r| normalize(r).unwrap()).collect();
    assert!(events.iter().all(|e| e.invoice_id == "154132541653705"));
    assert_eq!(events[0].sku, "21485");
    assert_eq!(events[1].total_cost, Decimal::new(21, 1));
}

#[test]
fn test_decode_array_of_records() {
    let payload = br#"[{"a":"1"},{"b":"2"}]"#;
    assert_eq!(decode_payload(payload).unwrap().len(), 2);
}

#[test]
fn test_decode_rejects_invalid_payloads() {
    assert!(decode_payload(b"not json").is_err());
    assert!(decode_payload(b"42").is_err());
    assert!(decode_payload(br#"{"invoice_no":1,"items":[]}"#).is_err());
    assert!(decode_payload(br#"{"invoice_no":1,"items":null}"#).is_err());
    assert!(decode_payload(br#"{"invoice_no":{"nested":true}}"#).is_err());
}

#[test]
fn test_decode_skips_null_fields() {
    let records = decode_payload(br#"{"title":null,"sku":"x"}"#).unwrap();
    assert!(!records[0].contains_key("title"));
}
