//! Filtering and sorting for catalog listings
//!
//! Sorting works on the serialized (camelCase) form of a record so any
//! field name a client sees can be used as a sort key. Absent values sort
//! first ascending and last descending. Strings that are RFC 3339
//! timestamps compare as instants, since their fractional-second width
//! varies.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use evadm_common::db::compare_values;
use evadm_common::models::{Customer, EventLocation, EventLocationStatus, SurveyResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Position given to event locations without an explicit `pos`
pub const UNPOSITIONED: i64 = 9999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortSpec {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }
}

/// Gift redemption state filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedemptionFilter {
    Redeemed,
    NotRedeemed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub location_id: Option<String>,
    /// Exact check-in status, e.g. `checked-in`
    pub status: Option<String>,
    pub redemption: Option<RedemptionFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter {
    pub search: Option<String>,
    pub status: Option<EventLocationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyFilter {
    pub search: Option<String>,
    pub event_location_id: Option<String>,
}

/// Lowercased search term, or `None` when blank
fn search_term(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

pub fn filter_customers(customers: Vec<Customer>, filter: &CustomerFilter) -> Vec<Customer> {
    let term = search_term(&filter.search);

    customers
        .into_iter()
        .filter(|c| {
            if let Some(location_id) = &filter.location_id {
                if c.location_id.as_ref() != Some(location_id) {
                    return false;
                }
            }
            if let Some(status) = &filter.status {
                if c.status.as_ref() != Some(status) {
                    return false;
                }
            }
            match filter.redemption {
                Some(RedemptionFilter::Redeemed) if !c.redeemed_gift => return false,
                Some(RedemptionFilter::NotRedeemed) if c.redeemed_gift => return false,
                _ => {}
            }

            let Some(term) = &term else {
                return true;
            };
            contains_ci(&c.full_name, term)
                || contains_ci(&c.email_address, term)
                || contains_ci(&c.id_number, term)
                || contains_ci(&c.customer_type, term)
                || contains_ci(&c.dealer_company_name, term)
                || c.contact_number.contains(term.as_str())
        })
        .collect()
}

pub fn filter_locations(locations: Vec<EventLocation>, filter: &LocationFilter) -> Vec<EventLocation> {
    let term = search_term(&filter.search);

    locations
        .into_iter()
        .filter(|l| {
            if filter.status.is_some_and(|s| s != l.status) {
                return false;
            }
            match &term {
                Some(term) => {
                    contains_ci(&l.location, term)
                        || contains_ci(&l.venue, term)
                        || contains_ci(&l.date, term)
                }
                None => true,
            }
        })
        .collect()
}

pub fn filter_surveys(responses: Vec<SurveyResponse>, filter: &SurveyFilter) -> Vec<SurveyResponse> {
    let term = search_term(&filter.search);

    responses
        .into_iter()
        .filter(|r| {
            if let Some(location_id) = &filter.event_location_id {
                if &r.event_location_id != location_id {
                    return false;
                }
            }
            match &term {
                Some(term) => {
                    contains_ci(&r.name, term)
                        || contains_ci(&r.email, term)
                        || contains_ci(&r.feedback, term)
                        || r.contact_number.contains(term.as_str())
                }
                None => true,
            }
        })
        .collect()
}

/// Stable sort by the serialized value of `sort.key`
pub fn sort_records<T: Serialize>(records: Vec<T>, sort: &SortSpec) -> Vec<T> {
    sort_with_default(records, sort, None)
}

/// Sort event locations; a missing `pos` counts as [`UNPOSITIONED`]
pub fn sort_locations(locations: Vec<EventLocation>, sort: &SortSpec) -> Vec<EventLocation> {
    let fallback = (sort.key == "pos").then(|| Value::from(UNPOSITIONED));
    sort_with_default(locations, sort, fallback)
}

fn sort_with_default<T: Serialize>(records: Vec<T>, sort: &SortSpec, fallback: Option<Value>) -> Vec<T> {
    let mut keyed: Vec<(Option<Value>, T)> = records
        .into_iter()
        .map(|record| {
            let key = serde_json::to_value(&record)
                .ok()
                .and_then(|v| v.get(&sort.key).cloned())
                .filter(|v| !v.is_null())
                .or_else(|| fallback.clone());
            (key, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        directed(compare_sort_keys(a.as_ref(), b.as_ref()), sort.direction)
    });

    keyed.into_iter().map(|(_, record)| record).collect()
}

fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(as_timestamp), b.and_then(as_timestamp)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => compare_values(a, b),
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.to_string(),
            full_name: name.to_string(),
            ..Default::default()
        }
    }

    fn location(id: &str, name: &str, pos: Option<i64>) -> EventLocation {
        EventLocation {
            id: id.to_string(),
            location: name.to_string(),
            date: "18 / 05 / 2025".to_string(),
            time: "9:00 AM".to_string(),
            venue: "Hotel Grand Baron".to_string(),
            status: EventLocationStatus::Upcoming,
            pos,
            max_capacity: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn ids<T>(records: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        records.iter().map(|r| id(r).to_string()).collect()
    }

    #[test]
    fn test_customer_search_fields() {
        let customers = vec![
            Customer {
                email_address: "ALI@example.com".to_string(),
                ..customer("a", "Ali")
            },
            Customer {
                dealer_company_name: "Sunrise Solar".to_string(),
                ..customer("b", "Bala")
            },
            Customer {
                contact_number: "0123456789".to_string(),
                ..customer("c", "Chong")
            },
        ];

        let by = |term: &str| {
            let filter = CustomerFilter {
                search: Some(term.to_string()),
                ..Default::default()
            };
            ids(&filter_customers(customers.clone(), &filter), |c| c.id.as_str())
        };

        assert_eq!(by("ali@"), vec!["a"]);
        assert_eq!(by("SOLAR"), vec!["b"]);
        assert_eq!(by("3456"), vec!["c"]);
        assert_eq!(by("  "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_customer_state_filters() {
        let customers = vec![
            Customer {
                status: Some("checked-in".to_string()),
                location_id: Some("kl".to_string()),
                ..customer("a", "Ali")
            },
            Customer {
                redeemed_gift: true,
                location_id: Some("kl".to_string()),
                ..customer("b", "Bala")
            },
            customer("c", "Chong"),
        ];

        let checked_in = CustomerFilter {
            status: Some("checked-in".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_customers(customers.clone(), &checked_in), |c| c.id.as_str()), vec!["a"]);

        let not_redeemed_kl = CustomerFilter {
            location_id: Some("kl".to_string()),
            redemption: Some(RedemptionFilter::NotRedeemed),
            ..Default::default()
        };
        assert_eq!(ids(&filter_customers(customers, &not_redeemed_kl), |c| c.id.as_str()), vec!["a"]);
    }

    #[test]
    fn test_sort_absent_values_first_ascending() {
        let customers = vec![
            Customer {
                status: Some("checked-in".to_string()),
                ..customer("a", "Ali")
            },
            customer("b", "Bala"),
        ];

        let asc = sort_records(customers.clone(), &SortSpec::new("status", SortDirection::Asc));
        assert_eq!(ids(&asc, |c| c.id.as_str()), vec!["b", "a"]);

        let desc = sort_records(customers, &SortSpec::new("status", SortDirection::Desc));
        assert_eq!(ids(&desc, |c| c.id.as_str()), vec!["a", "b"]);
    }

    #[test]
    fn test_sort_by_name_descending() {
        let customers = vec![customer("a", "Ali"), customer("c", "Chong"), customer("b", "Bala")];
        let sorted = sort_records(customers, &SortSpec::new("fullName", SortDirection::Desc));
        assert_eq!(ids(&sorted, |c| c.id.as_str()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_timestamps_within_one_second() {
        use chrono::{Duration, TimeZone, Utc};

        let base = Utc.with_ymd_and_hms(2025, 5, 18, 1, 0, 0).unwrap();
        let checked_in_at = |id: &str, offset: Duration| Customer {
            check_time_stamp: Some(base + offset),
            ..customer(id, id)
        };
        let customers = vec![
            checked_in_at("late", Duration::nanoseconds(123_456_789)),
            checked_in_at("early", Duration::milliseconds(123)),
            checked_in_at("whole", Duration::zero()),
            customer("never", "never"),
        ];

        let asc = sort_records(customers.clone(), &SortSpec::new("checkTimeStamp", SortDirection::Asc));
        assert_eq!(ids(&asc, |c| c.id.as_str()), vec!["never", "whole", "early", "late"]);

        let desc = sort_records(customers, &SortSpec::new("checkTimeStamp", SortDirection::Desc));
        assert_eq!(ids(&desc, |c| c.id.as_str()), vec!["late", "early", "whole", "never"]);
    }

    #[test]
    fn test_location_pos_defaults_to_end() {
        let locations = vec![
            location("x", "Kluang", None),
            location("y", "Taiping", Some(2)),
            location("z", "Melaka", Some(1)),
        ];

        let sorted = sort_locations(locations, &SortSpec::new("pos", SortDirection::Asc));
        assert_eq!(ids(&sorted, |l| l.id.as_str()), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_location_filters() {
        let mut closed = location("y", "Taiping", None);
        closed.status = EventLocationStatus::Closed;
        let locations = vec![location("x", "Kluang", None), closed];

        let filter = LocationFilter {
            status: Some(EventLocationStatus::Closed),
            ..Default::default()
        };
        assert_eq!(ids(&filter_locations(locations.clone(), &filter), |l| l.id.as_str()), vec!["y"]);

        let filter = LocationFilter {
            search: Some("kLu".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_locations(locations, &filter), |l| l.id.as_str()), vec!["x"]);
    }

    #[test]
    fn test_survey_filter_and_numeric_sort() {
        let responses = vec![
            SurveyResponse {
                id: "s1".to_string(),
                event_location_id: "kl".to_string(),
                session_app: 3,
                feedback: "Great venue".to_string(),
                ..Default::default()
            },
            SurveyResponse {
                id: "s2".to_string(),
                event_location_id: "kl".to_string(),
                session_app: 5,
                ..Default::default()
            },
            SurveyResponse {
                id: "s3".to_string(),
                event_location_id: "jb".to_string(),
                session_app: 4,
                ..Default::default()
            },
        ];

        let filter = SurveyFilter {
            event_location_id: Some("kl".to_string()),
            ..Default::default()
        };
        let kl = filter_surveys(responses.clone(), &filter);
        let sorted = sort_records(kl, &SortSpec::new("session-app", SortDirection::Desc));
        assert_eq!(ids(&sorted, |r| r.id.as_str()), vec!["s2", "s1"]);

        let filter = SurveyFilter {
            search: Some("venue".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_surveys(responses, &filter), |r| r.id.as_str()), vec!["s1"]);
    }
}
