use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Failure to deserialize a serialized route list. Propagated to the caller,
/// never swallowed.
#[derive(Debug, Error)]
pub enum RouteParseError {
    #[error("malformed route list: {0}")]
    Malformed(#[from] simd_json::Error),
}

/// One route as carried in serialized row props.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub mode: String,
    #[serde(rename = "shortName", default)]
    pub short_name: String,
}

/// Deserialize a JSON route list, e.g.
/// `[{"mode":"BUS","shortName":"154"},{"mode":"TRAM","shortName":"7A"}]`.
pub fn parse_routes(raw: &str) -> Result<Vec<Route>, RouteParseError> {
    let mut buf = raw.as_bytes().to_vec();
    Ok(simd_json::serde::from_slice(&mut buf)?)
}

/// Display rank of a transport mode; unknown modes sort last.
fn mode_rank(mode: &str) -> u8 {
    match mode.to_ascii_uppercase().as_str() {
        "TRAM" => 0,
        "SUBWAY" => 1,
        "RAIL" => 2,
        "BUS" => 3,
        "FERRY" => 4,
        "CITYBIKE" => 5,
        _ => 6,
    }
}

/// Shared route ordering: mode rank first, then natural order on the short
/// name so "9" sorts before "10". Total and stable; sorting twice gives the
/// same result as sorting once.
pub fn route_compare(a: &Route, b: &Route) -> Ordering {
    mode_rank(&a.mode)
        .cmp(&mode_rank(&b.mode))
        .then_with(|| natural_cmp(&a.short_name, &b.short_name))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_num, a_rest) = split_leading_number(a);
    let (b_num, b_rest) = split_leading_number(b);
    a_num
        .cmp(&b_num)
        .then_with(|| a_rest.cmp(b_rest))
        .then_with(|| a.cmp(b))
}

/// Split a leading decimal number off a short name ("550B" -> (550, "B")).
fn split_leading_number(s: &str) -> (Option<u64>, &str) {
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        (None, s)
    } else {
        (s[..digits].parse().ok(), &s[digits..])
    }
}
