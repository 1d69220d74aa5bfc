//! Typed views over the documents the service reads.
//!
//! Records are owned by an external system, so every field is optional and
//! decoding is lenient about number/string representations.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Agent record field names.
pub mod agent_fields {
    pub const KEY: &str = "cpId";
    pub const TOKENS: &str = "fsmToken";
    pub const ENQUIRY_CREDITS: &str = "inboundEnquiryCredits";
}

/// Listing record field names.
pub mod listing_fields {
    pub const PROPERTY_ID: &str = "propertyId";
    pub const ADDED_AT: &str = "dateOfInventoryAdded";
    pub const AGE_OF_INVENTORY: &str = "ageOfInventory";
    pub const AGE_OF_STATUS: &str = "ageOfStatus";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    #[serde(default, deserialize_with = "lax_string")]
    pub cp_id: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub preferred_micromarket: Option<String>,
    #[serde(default, deserialize_with = "lax_i64")]
    pub inbound_enquiry_credits: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default, deserialize_with = "lax_string")]
    pub cp_code: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub name_of_the_property: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub property_id: Option<String>,
    /// Seconds since epoch.
    #[serde(default, deserialize_with = "lax_i64")]
    pub date_of_inventory_added: Option<i64>,
    /// Seconds since epoch.
    #[serde(default, deserialize_with = "lax_i64")]
    pub date_of_status_last_checked: Option<i64>,
    #[serde(default, deserialize_with = "lax_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub micromarket: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcRecord {
    #[serde(default, deserialize_with = "lax_string")]
    pub cp_code: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub name_of_the_property: Option<String>,
    #[serde(default, deserialize_with = "lax_string")]
    pub qc_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryRecord {
    /// The enquiring agent.
    #[serde(default, deserialize_with = "lax_string")]
    pub cp_id: Option<String>,
    /// Business id of the listing asked about.
    #[serde(default, deserialize_with = "lax_string")]
    pub property_id: Option<String>,
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days elapsed between `since` and `now`, both in epoch seconds.
pub fn age_in_days(now: i64, since: Option<i64>) -> Option<i64> {
    since.map(|ts| now.saturating_sub(ts).div_euclid(SECONDS_PER_DAY))
}

fn lax_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}

/// Accepts integers, floats (truncated) and numeric strings.
fn lax_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_to_i64))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("number out of range: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(truncate_to_i64)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

/// `None` for NaN, infinities and values outside the `i64` range.
#[allow(
    clippy::cast_possible_truncation,
    reason = "fractional seconds are dropped on purpose; range is checked first"
)]
fn truncate_to_i64(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    let t = f.trunc();
    (t.is_finite() && (-LIMIT..LIMIT).contains(&t)).then(|| t as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_accepts_mixed_timestamp_representations() {
        let listing: ListingRecord = serde_json::from_value(json!({
            "cpCode": "CP1",
            "propertyId": 1042,
            "dateOfInventoryAdded": 1_700_000_000.75,
            "dateOfStatusLastChecked": "1700086400",
            "status": "Available"
        }))
        .expect("decode listing");

        assert_eq!(listing.property_id.as_deref(), Some("1042"));
        assert_eq!(listing.date_of_inventory_added, Some(1_700_000_000));
        assert_eq!(listing.date_of_status_last_checked, Some(1_700_086_400));
        assert_eq!(listing.micromarket, None);
    }

    #[test]
    fn missing_and_null_fields_decode_as_none() {
        let listing: ListingRecord =
            serde_json::from_value(json!({ "dateOfStatusLastChecked": null }))
                .expect("decode listing");
        assert_eq!(listing.date_of_status_last_checked, None);
        assert_eq!(listing.status, None);
    }

    #[test]
    fn out_of_range_timestamps_are_rejected() {
        let res = serde_json::from_value::<ListingRecord>(json!({ "dateOfInventoryAdded": 1e300 }));
        assert!(res.is_err());
        let res = serde_json::from_value::<ListingRecord>(json!({ "dateOfInventoryAdded": "NaN" }));
        assert!(res.is_err());
        assert_eq!(truncate_to_i64(-12.9), Some(-12));
    }

    #[test]
    fn age_floors_whole_days() {
        let now = 1_700_000_000;
        assert_eq!(age_in_days(now, Some(now - 86_400 * 12 - 5)), Some(12));
        assert_eq!(age_in_days(now, Some(now - 86_400 * 12 + 5)), Some(11));
        assert_eq!(age_in_days(now, Some(now + 10)), Some(-1));
        assert_eq!(age_in_days(now, None), None);
    }
}
