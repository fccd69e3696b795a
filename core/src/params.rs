//! Call parameters and their canonical flat form.
//!
//! # Design
//! Callers describe an action's arguments as a tree of `ParameterValue`s.
//! `canonicalize` flattens that tree into the dot-notated key set the remote
//! service expects (`List.1`, `Map.Child`, `List.2.Child`, ...). The result
//! is a `BTreeMap`, so iteration order is the byte order of the keys, which is
//! also the order the signer needs.
//!
//! Flattening is a pure recursive function: every level returns a fresh map
//! and the parent merges it, so no accumulator is shared between calls.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{MwsError, Result};

/// Flat, dot-notated parameters ready for encoding and signing.
pub type CanonicalParams = BTreeMap<String, String>;

/// A single caller-supplied argument before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParameterValue>),
    Map(Parameters),
}

/// Named arguments of one call, in caller order.
///
/// A `None` value is the "absent" argument and is dropped during
/// canonicalization, which lets optional fields be passed through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, Option<ParameterValue>)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a present argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.entries.push((name.into(), Some(value.into())));
        self
    }

    /// Add an optional argument; `None` is kept as absent.
    pub fn with_opt<V: Into<ParameterValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.entries.push((name.into(), value.map(Into::into)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParameterValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Convert any serializable value (usually a `#[derive(Serialize)]`
    /// parameter struct) into `Parameters`.
    ///
    /// JSON `null` becomes an absent argument, so `Option` fields that are
    /// `None` vanish from the request. The top-level value must serialize to
    /// an object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value).map_err(|e| MwsError::Parameters(e.to_string()))?;
        match json {
            serde_json::Value::Object(map) => Ok(Self {
                entries: map.into_iter().map(|(k, v)| (k, from_json(v))).collect(),
            }),
            other => Err(MwsError::Parameters(format!(
                "expected an object of named parameters, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), Some(v.into()))).collect(),
        }
    }
}

fn from_json(value: serde_json::Value) -> Option<ParameterValue> {
    use serde_json::Value;

    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ParameterValue::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(ParameterValue::Integer(i)),
            // u64 beyond i64::MAX and fractional numbers
            None => n.as_f64().map(ParameterValue::Float),
        },
        Value::String(s) => Some(ParameterValue::Text(s)),
        // Nulls inside a sequence have no position to hold; drop them.
        Value::Array(items) => Some(ParameterValue::List(items.into_iter().filter_map(from_json).collect())),
        Value::Object(map) => Some(ParameterValue::Map(Parameters {
            entries: map.into_iter().map(|(k, v)| (k, from_json(v))).collect(),
        })),
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<&String> for ParameterValue {
    fn from(value: &String) -> Self {
        ParameterValue::Text(value.clone())
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

macro_rules! integer_parameter {
    ($($t:ty),*) => {
        $(impl From<$t> for ParameterValue {
            fn from(value: $t) -> Self {
                ParameterValue::Integer(i64::from(value))
            }
        })*
    };
}

integer_parameter!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(f64::from(value))
    }
}

impl From<Parameters> for ParameterValue {
    fn from(value: Parameters) -> Self {
        ParameterValue::Map(value)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(value: Vec<T>) -> Self {
        ParameterValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<ParameterValue>> From<&[T]> for ParameterValue {
    fn from(value: &[T]) -> Self {
        ParameterValue::List(value.iter().cloned().map(Into::into).collect())
    }
}

impl ParameterValue {
    /// Text form of a scalar, or `None` for collections and for values that
    /// do not coerce to a number (`NaN`).
    fn scalar_text(&self) -> Option<String> {
        match self {
            ParameterValue::Text(s) => Some(s.clone()),
            ParameterValue::Integer(i) => Some(i.to_string()),
            ParameterValue::Float(f) => format_float(*f),
            ParameterValue::Bool(b) => Some(b.to_string()),
            ParameterValue::List(_) | ParameterValue::Map(_) => None,
        }
    }
}

fn format_float(value: f64) -> Option<String> {
    if value.is_nan() {
        None
    } else if value.is_infinite() {
        Some(if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else if value == 0.0 {
        Some("0".to_string())
    } else if (1e-6..1e21).contains(&value.abs()) {
        // Shortest round-trip form; integral values print without a fraction.
        Some(value.to_string())
    } else {
        // `1e21` -> `1e+21`, `1.5e-7` stays.
        let scientific = format!("{value:e}");
        Some(match scientific.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
            _ => scientific,
        })
    }
}

/// Flatten named parameters into their canonical dot-notated form.
pub fn canonicalize(parameters: &Parameters) -> CanonicalParams {
    parameters
        .iter()
        .filter_map(|(name, value)| value.map(|v| flatten(name, v)))
        .fold(CanonicalParams::new(), merge)
}

fn flatten(key: &str, value: &ParameterValue) -> CanonicalParams {
    if let Some(text) = value.scalar_text() {
        return CanonicalParams::from([(key.to_string(), text)]);
    }
    match value {
        ParameterValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| flatten(&format!("{key}.{}", index + 1), item))
            .fold(CanonicalParams::new(), merge),
        ParameterValue::Map(children) => canonicalize(children)
            .into_iter()
            .map(|(child, text)| (format!("{key}.{child}"), text))
            .collect(),
        _ => CanonicalParams::new(),
    }
}

fn merge(mut acc: CanonicalParams, next: CanonicalParams) -> CanonicalParams {
    acc.extend(next);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pairs: &[(&str, &str)]) -> CanonicalParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn scalars_are_emitted_under_their_key() {
        let params = Parameters::new()
            .with("Name", "value")
            .with("Count", 3)
            .with("Ratio", 1.5);
        assert_eq!(
            canonicalize(&params),
            flat(&[("Name", "value"), ("Count", "3"), ("Ratio", "1.5")])
        );
    }

    #[test]
    fn booleans_become_literal_true_false() {
        let params = Parameters::new().with("Flag", true).with("Other", false);
        assert_eq!(canonicalize(&params), flat(&[("Flag", "true"), ("Other", "false")]));
    }

    #[test]
    fn absent_values_are_dropped() {
        let params = Parameters::new()
            .with("Present", "x")
            .with_opt::<&str>("Missing", None);
        assert_eq!(canonicalize(&params), flat(&[("Present", "x")]));
    }

    #[test]
    fn sequences_are_one_indexed() {
        let params = Parameters::new().with("Foo", vec!["a", "b"]);
        assert_eq!(canonicalize(&params), flat(&[("Foo.1", "a"), ("Foo.2", "b")]));
    }

    #[test]
    fn mappings_inside_sequences_recurse() {
        let item = Parameters::new().with("Bar", "x");
        let params = Parameters::new().with("Foo", vec![ParameterValue::Map(item)]);
        assert_eq!(canonicalize(&params), flat(&[("Foo.1.Bar", "x")]));
    }

    #[test]
    fn nested_mappings_use_dotted_prefixes() {
        let address = Parameters::new()
            .with("Name", "Jane Doe")
            .with("City", "Seattle")
            .with_opt::<&str>("AddressLine2", None);
        let params = Parameters::new().with("ShipFromAddress", address);
        assert_eq!(
            canonicalize(&params),
            flat(&[("ShipFromAddress.Name", "Jane Doe"), ("ShipFromAddress.City", "Seattle")])
        );
    }

    #[test]
    fn nested_sequences_recurse_with_one_based_indices() {
        let params = Parameters::new().with(
            "Grid",
            ParameterValue::List(vec![ParameterValue::from(vec!["a", "b"]), ParameterValue::from(vec!["c"])]),
        );
        assert_eq!(
            canonicalize(&params),
            flat(&[("Grid.1.1", "a"), ("Grid.1.2", "b"), ("Grid.2.1", "c")])
        );
    }

    #[test]
    fn empty_collections_vanish() {
        let params = Parameters::new()
            .with("Foo", Vec::<String>::new())
            .with("Bar", Parameters::new())
            .with("Keep", "k");
        assert_eq!(canonicalize(&params), flat(&[("Keep", "k")]));
    }

    #[test]
    fn nan_is_not_coercible_and_vanishes() {
        let params = Parameters::new()
            .with("Nan", f64::NAN)
            .with("List", vec![f64::NAN, 2.0]);
        assert_eq!(canonicalize(&params), flat(&[("List.2", "2")]));
    }

    #[test]
    fn integral_floats_print_without_fraction() {
        let params = Parameters::new()
            .with("Whole", 2.0)
            .with("Up", f64::INFINITY)
            .with("Down", f64::NEG_INFINITY);
        assert_eq!(
            canonicalize(&params),
            flat(&[("Whole", "2"), ("Up", "Infinity"), ("Down", "-Infinity")])
        );
    }

    #[test]
    fn extreme_floats_use_exponent_form() {
        let params = Parameters::new()
            .with("Big", 1e21)
            .with("Bigger", -2.5e30)
            .with("Small", 1e-7)
            .with("Edge", 1e-6)
            .with("Under", 999_999_999_999_999_900_000.0)
            .with("NegZero", -0.0);
        assert_eq!(
            canonicalize(&params),
            flat(&[
                ("Big", "1e+21"),
                ("Bigger", "-2.5e+30"),
                ("Small", "1e-7"),
                ("Edge", "0.000001"),
                ("Under", "999999999999999900000"),
                ("NegZero", "0"),
            ])
        );
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let params = Parameters::new()
            .with("B", vec![ParameterValue::Map(Parameters::new().with("X", 1))])
            .with("A", "1");
        assert_eq!(canonicalize(&params), canonicalize(&params));
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct ListOrders {
        #[serde(rename = "MarketplaceId.Id")]
        marketplace_id: Vec<String>,
        created_after: Option<String>,
        max_results_per_page: Option<u32>,
        easy_ship_shipment_status: Vec<String>,
    }

    #[test]
    fn from_serialize_drops_none_and_flattens() {
        let params = Parameters::from_serialize(&ListOrders {
            marketplace_id: vec!["ATVPDKIKX0DER".to_string()],
            created_after: Some("2020-01-01T00:00:00.000Z".to_string()),
            max_results_per_page: None,
            easy_ship_shipment_status: Vec::new(),
        })
        .unwrap();
        assert_eq!(
            canonicalize(&params),
            flat(&[
                ("MarketplaceId.Id.1", "ATVPDKIKX0DER"),
                ("CreatedAfter", "2020-01-01T00:00:00.000Z"),
            ])
        );
    }

    #[test]
    fn from_serialize_rejects_non_objects() {
        let err = Parameters::from_serialize(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, MwsError::Parameters(_)));
    }

    #[test]
    fn collect_from_pairs() {
        assert!(Parameters::new().is_empty());
        let params: Parameters = [("A", "1"), ("B", "2")].into_iter().collect();
        assert!(!params.is_empty());
        assert_eq!(params.len(), 2);
        assert_eq!(canonicalize(&params), flat(&[("A", "1"), ("B", "2")]));
    }
}
