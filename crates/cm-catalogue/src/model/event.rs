//! Face-to-face event entity.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A single day of a scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Where an event takes place and how many learners it can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub location: String,

    #[serde(default)]
    pub address: String,

    pub capacity: u32,

    pub min_capacity: u32,
}

/// A scheduled run of a face-to-face module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub date_ranges: Vec<DateRange>,

    /// Absent until the location wizard step has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
}

impl Event {
    /// Date ranges ordered by date, earliest first. Used when an event is
    /// offered for selection in the audience wizard.
    pub fn sorted_date_ranges(&self) -> Vec<DateRange> {
        let mut ranges = self.date_ranges.clone();
        ranges.sort_by_key(|r| r.date);
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_ranges_sort_by_date() {
        let event: Event = serde_json::from_value(json!({
            "dateRanges": [
                {"date": "2019-03-01", "startTime": "09:00:00", "endTime": "17:00:00"},
                {"date": "2019-01-01", "startTime": "09:00:00", "endTime": "17:00:00"}
            ]
        }))
        .unwrap();

        let sorted = event.sorted_date_ranges();
        assert_eq!(sorted[0].date.to_string(), "2019-01-01");
        assert_eq!(sorted[1].date.to_string(), "2019-03-01");
    }

    #[test]
    fn venue_defaults_to_absent() {
        let event: Event = serde_json::from_value(json!({})).unwrap();
        assert!(event.venue.is_none());
        assert!(event.date_ranges.is_empty());
    }
}
