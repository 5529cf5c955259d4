//! Pure query evaluation over raw records.
//!
//! These functions implement filtering, sorting, field projection, and
//! pagination for the in-memory store. They are pure: no I/O, no locking,
//! records in, records out.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use japi_core::query::{FilterOp, FilterTerm, Page, Sort, SortDirection};
use japi_core::record::Record;

/// Type-erased, orderable view of a JSON value.
///
/// Numbers are normalized to f64 so integer and float encodings compare.
/// Ordering is only defined between values of identical runtime type;
/// cross-type pairs are incomparable.
#[derive(Debug)]
enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(b) => Comparable::Bool(*b),
            Value::Number(n) => n.as_f64().map(Comparable::Number).unwrap_or(Comparable::Null),
            Value::String(s) => Comparable::String(s),
            // Arrays and objects are not orderable.
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Loose (type-coercing) equality.
///
/// The wire layer may deliver stringified numbers; strict equality would
/// incorrectly reject `"22"` against `22`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    matches!((numeric(a), numeric(b)), (Some(x), Some(y)) if x == y)
}

/// Orders two field values, coercing numeric strings so wire-shaped
/// operands compare against stored numbers.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }
    Comparable::from(a).partial_cmp(&Comparable::from(b))
}

fn op_passes(op: FilterOp, value: &Value, operand: &Value) -> bool {
    match op {
        FilterOp::Eq => loose_eq(value, operand),
        FilterOp::Strict => value == operand,
        FilterOp::In => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| loose_eq(value, item))),
        FilterOp::Gt => compare(value, operand) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare(value, operand),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        FilterOp::Lt => compare(value, operand) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare(value, operand),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
    }
}

/// Whether a record passes every field entry of a filter specification.
///
/// A field that is absent from the record fails its entry outright, whatever
/// the term shape. Operator maps require all listed operators to pass.
pub fn matches_filter(record: &Record, filter: &BTreeMap<String, FilterTerm>) -> bool {
    filter.iter().all(|(field, term)| {
        let Some(value) = record.get(field) else {
            return false;
        };
        match term {
            FilterTerm::Eq(expected) => loose_eq(value, expected),
            FilterTerm::Predicate(predicate) => predicate(value),
            FilterTerm::Ops(ops) => ops.iter().all(|(op, operand)| op_passes(*op, value, operand)),
        }
    })
}

/// Sorts records in place, cascading across the sort keys in order.
///
/// The first key is the primary comparator; ties fall through to later keys.
/// Incomparable (cross-type or missing) pairs compare equal, leaving their
/// relative order as the input had it (the sort is stable).
pub fn sort_records(records: &mut [Record], sort: &[Sort]) {
    if sort.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in sort {
            let ordering = match (a.get(&key.field), b.get(&key.field)) {
                (Some(left), Some(right)) => compare(left, right).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Drops every field not named by the sparse fieldset.
///
/// The `id` field is always retained regardless of the fieldset.
pub fn project_fields(record: &mut Record, fields: &[String]) {
    record.retain(|key, _| key == "id" || fields.iter().any(|field| field == key));
}

/// Applies a pagination window with slice semantics.
///
/// Out-of-bounds offsets or limits yield an empty or truncated result, never
/// an error.
pub fn paginate<T>(items: Vec<T>, page: Option<&Page>) -> Vec<T> {
    let Some(page) = page else {
        return items;
    };
    items
        .into_iter()
        .skip(page.offset.unwrap_or(0))
        .take(page.limit.unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use japi_core::query::FindOptions;
    use japi_core::record::record_id;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn people() -> Vec<Record> {
        vec![
            record(json!({"id": 1, "age": 22, "name": "A"})),
            record(json!({"id": 2, "age": 32, "name": "B"})),
            record(json!({"id": 3, "age": 92, "name": "C"})),
        ]
    }

    #[test]
    fn operator_filter_selects_matches() {
        let options = FindOptions::builder()
            .filter("age", FilterTerm::from_value(json!({"$lt": 24})))
            .build();
        let matches: Vec<_> = people()
            .into_iter()
            .filter(|r| matches_filter(r, &options.filter))
            .collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(record_id(&matches[0]), Some(1));
    }

    #[test]
    fn equality_is_loose() {
        let filter = FindOptions::builder()
            .filter("age", FilterTerm::Eq(json!("22")))
            .build()
            .filter;
        assert!(matches_filter(&record(json!({"id": 1, "age": 22})), &filter));
        assert!(!matches_filter(&record(json!({"id": 2, "age": 23})), &filter));
    }

    #[test]
    fn operator_maps_are_conjunctive() {
        let filter = FindOptions::builder()
            .filter("age", FilterTerm::from_value(json!({"$gte": 30, "$lt": 90})))
            .build()
            .filter;
        let ids: Vec<_> = people()
            .into_iter()
            .filter(|r| matches_filter(r, &filter))
            .filter_map(|r| record_id(&r))
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn in_operator_tests_membership() {
        let filter = FindOptions::builder()
            .filter("age", FilterTerm::from_value(json!({"$in": [22, "92"]})))
            .build()
            .filter;
        let ids: Vec<_> = people()
            .into_iter()
            .filter(|r| matches_filter(r, &filter))
            .filter_map(|r| record_id(&r))
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn unknown_operator_compares_strictly() {
        let filter = FindOptions::builder()
            .filter("age", FilterTerm::from_value(json!({"$bogus": "22"})))
            .build()
            .filter;
        // Strict equality: stringified number no longer matches.
        assert!(!matches_filter(&record(json!({"id": 1, "age": 22})), &filter));
        assert!(matches_filter(&record(json!({"id": 1, "age": "22"})), &filter));
    }

    #[test]
    fn predicate_terms_receive_the_raw_value() {
        let filter = FindOptions::builder()
            .filter(
                "name",
                FilterTerm::predicate(|v| v.as_str().is_some_and(|s| s < "C")),
            )
            .build()
            .filter;
        let ids: Vec<_> = people()
            .into_iter()
            .filter(|r| matches_filter(r, &filter))
            .filter_map(|r| record_id(&r))
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn absent_field_fails_the_filter() {
        let filter = FindOptions::builder()
            .filter("missing", FilterTerm::Eq(json!(1)))
            .build()
            .filter;
        assert!(!matches_filter(&record(json!({"id": 1})), &filter));
    }

    #[test]
    fn sort_cascades_across_keys() {
        let mut records = vec![
            record(json!({"id": 1, "group": "b", "name": "x"})),
            record(json!({"id": 2, "group": "a", "name": "z"})),
            record(json!({"id": 3, "group": "a", "name": "y"})),
        ];
        sort_records(
            &mut records,
            &[
                Sort {
                    field: "group".into(),
                    direction: SortDirection::Asc,
                },
                Sort {
                    field: "name".into(),
                    direction: SortDirection::Asc,
                },
            ],
        );
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn sort_survives_type_mismatch() {
        let mut records = vec![
            record(json!({"id": 1, "age": 22, "name": "A"})),
            record(json!({"id": 2, "age": "x", "name": "B"})),
        ];
        // Must not panic; incomparable pairs keep input order.
        sort_records(
            &mut records,
            &[Sort {
                field: "age".into(),
                direction: SortDirection::Asc,
            }],
        );
        assert_eq!(records.len(), 2);
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn projection_always_keeps_id() {
        let mut r = record(json!({"id": 1, "age": 5, "name": "x"}));
        project_fields(&mut r, &["age".to_string()]);
        assert_eq!(Value::Object(r), json!({"id": 1, "age": 5}));
    }

    #[test]
    fn pagination_uses_slice_semantics() {
        let items: Vec<u64> = vec![1, 2, 3];
        let page = Page {
            offset: Some(1),
            limit: Some(1),
        };
        assert_eq!(paginate(items.clone(), Some(&page)), vec![2]);

        // Beyond bounds truncates to empty, never errors.
        let beyond = Page {
            offset: Some(9),
            limit: Some(5),
        };
        assert!(paginate(items.clone(), Some(&beyond)).is_empty());
        assert_eq!(paginate(items, None), vec![1, 2, 3]);
    }
}
