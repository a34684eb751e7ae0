//! Wire types for the upstream wait-times service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ride as reported by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    /// Upstream ride identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Whether the ride is currently operating.
    pub is_open: bool,
    /// Posted wait in minutes.
    pub wait_time: i64,
    /// Upstream-reported last update time (ISO string, passed through).
    pub last_updated: String,
}

/// One historical wait-time sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideWaitTimeEntry {
    /// Ride identifier the sample belongs to.
    pub ride_id: i64,
    /// Ride name at sample time.
    pub ride_name: String,
    /// Posted wait in minutes.
    pub wait_time: i64,
    /// When the sample was taken.
    pub snapshot_time: DateTime<Utc>,
}

/// Complete payload returned by the upstream `/wait-times` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitTimesResponse {
    /// Every ride currently known to the park feed.
    pub all_rides: Vec<Ride>,
    /// Rides remaining after the upstream's configured filter.
    pub filtered_rides: Vec<Ride>,
    /// Filtered rides ordered by wait time.
    pub sorted_rides: Vec<Ride>,
    /// Flat history across all tracked rides.
    pub flat_rides_history: Vec<RideWaitTimeEntry>,
    /// History ordered per ride and snapshot time.
    pub sorted_ride_history: Vec<RideWaitTimeEntry>,
}

/// Response envelope served to dashboard clients, annotated with cache
/// provenance so the UI can surface "served from cache".
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedWaitTimes {
    /// The upstream payload, flattened into the envelope.
    #[serde(flatten)]
    pub payload: WaitTimesResponse,
    /// When the payload was stored (insertion time for hits, now for fresh fetches).
    #[serde(rename = "_cachedAt")]
    pub cached_at: DateTime<Utc>,
    /// Whether the payload was served from the cache.
    #[serde(rename = "_fromCache")]
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ride_round_trips_upstream_field_names() {
        let raw = json!({
            "id": 42,
            "name": "Space Mountain",
            "is_open": true,
            "wait_time": 35,
            "last_updated": "2026-08-01T12:00:00Z"
        });
        let ride: Ride = serde_json::from_value(raw).unwrap();
        assert_eq!(ride.id, 42);
        assert_eq!(ride.wait_time, 35);
    }

    #[test]
    fn history_entries_use_camel_case() {
        let raw = json!({
            "rideId": 7,
            "rideName": "Matterhorn",
            "waitTime": 20,
            "snapshotTime": "2026-08-01T12:00:00Z"
        });
        let entry: RideWaitTimeEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.ride_id, 7);
        assert_eq!(entry.ride_name, "Matterhorn");
    }

    #[test]
    fn annotation_markers_are_prefixed() {
        let envelope = AnnotatedWaitTimes {
            payload: WaitTimesResponse::default(),
            cached_at: Utc::now(),
            from_cache: true,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["_fromCache"], json!(true));
        assert!(value.get("_cachedAt").is_some());
        assert!(value.get("all_rides").is_some());
    }
}
