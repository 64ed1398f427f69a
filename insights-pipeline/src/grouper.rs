//! Partition visits per customer and index service/staff usage.
//!
//! Inclusion is visit-driven: a customer exists only if at least one visit
//! names them. Usage rows whose visit cannot be traced to a customer are
//! dropped without error.

use std::collections::{HashMap, HashSet};

use crate::counter::OccurrenceCounter;
use crate::types::{ServiceUsageRecord, VisitRecord};

/// Display name used when a visit carries no customer profile name.
pub const UNKNOWN_CUSTOMER_NAME: &str = "Unknown";

/// All visits of one customer, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerAggregate {
    pub customer_id: String,
    pub name: String,
    pub visits: Vec<VisitRecord>,
}

/// Per-customer service and staff occurrence counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceAggregation {
    pub service_counts: OccurrenceCounter,
    pub staff_counts: OccurrenceCounter,
}

/// Output of `group_visits_by_customer`.
#[derive(Clone, Debug, Default)]
pub struct VisitGrouping {
    /// One aggregate per distinct customer, in first-seen order.
    pub customers: Vec<CustomerAggregate>,
    pub visit_customers: HashMap<String, String>,
    /// Direct staff attribution of each visit; fallback for usage rows
    /// that name no staff member.
    pub visit_staff: HashMap<String, String>,
}

impl VisitGrouping {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn customer_ids(&self) -> Vec<String> {
        self.customers.iter().map(|c| c.customer_id.clone()).collect()
    }

    pub fn visit_ids(&self) -> Vec<String> {
        self.customers
            .iter()
            .flat_map(|c| c.visits.iter().map(|v| v.id.clone()))
            .collect()
    }
}

/// Output of `group_services_by_customer`.
#[derive(Clone, Debug, Default)]
pub struct ServiceUsageIndex {
    pub aggregations: HashMap<String, ServiceAggregation>,
    /// Distinct service ids, first-seen order, for batched name lookup.
    pub service_ids: Vec<String>,
    /// Distinct staff ids, first-seen order, for batched name lookup.
    pub staff_ids: Vec<String>,
}

pub fn group_visits_by_customer(visits: &[VisitRecord]) -> VisitGrouping {
    let mut grouping = VisitGrouping::default();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for visit in visits {
        if visit.id.is_empty() || visit.customer_id.is_empty() {
            log::debug!("skipping visit without id or customer: {:?}", visit.id);
            continue;
        }

        grouping
            .visit_customers
            .insert(visit.id.clone(), visit.customer_id.clone());
        if let Some(ref staff_id) = visit.staff_id {
            grouping
                .visit_staff
                .insert(visit.id.clone(), staff_id.clone());
        }

        let slot = *slots.entry(visit.customer_id.clone()).or_insert_with(|| {
            grouping.customers.push(CustomerAggregate {
                customer_id: visit.customer_id.clone(),
                name: visit
                    .customer_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_CUSTOMER_NAME.to_string()),
                visits: Vec::new(),
            });
            grouping.customers.len() - 1
        });
        grouping.customers[slot].visits.push(visit.clone());
    }

    grouping
}

pub fn group_services_by_customer(
    usage: &[ServiceUsageRecord],
    grouping: &VisitGrouping,
) -> ServiceUsageIndex {
    let mut index = ServiceUsageIndex::default();
    let mut seen_services: HashSet<String> = HashSet::new();
    let mut seen_staff: HashSet<String> = HashSet::new();

    for entry in usage {
        let Some(customer_id) = grouping.visit_customers.get(&entry.visit_id) else {
            continue;
        };
        let aggregate = index.aggregations.entry(customer_id.clone()).or_default();

        if let Some(ref service_id) = entry.service_id {
            aggregate.service_counts.increment(service_id);
            if seen_services.insert(service_id.clone()) {
                index.service_ids.push(service_id.clone());
            }
        }

        let staff_id = entry
            .staff_id
            .as_ref()
            .or_else(|| grouping.visit_staff.get(&entry.visit_id));
        if let Some(staff_id) = staff_id {
            aggregate.staff_counts.increment(staff_id);
            if seen_staff.insert(staff_id.clone()) {
                index.staff_ids.push(staff_id.clone());
            }
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VisitStatus;
    use chrono::{TimeZone, Utc};

    fn visit(id: &str, customer: &str, staff: Option<&str>, day: u32) -> VisitRecord {
        VisitRecord {
            id: id.into(),
            customer_id: customer.into(),
            customer_name: Some(format!("{}-name", customer)),
            staff_id: staff.map(String::from),
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap(),
            status: VisitStatus::Completed,
        }
    }

    fn usage(visit_id: &str, service: Option<&str>, staff: Option<&str>) -> ServiceUsageRecord {
        ServiceUsageRecord {
            visit_id: visit_id.into(),
            service_id: service.map(String::from),
            staff_id: staff.map(String::from),
        }
    }

    #[test]
    fn groups_in_first_seen_order_and_keeps_visit_order() {
        let visits = vec![
            visit("v3", "c2", None, 20),
            visit("v2", "c1", None, 10),
            visit("v1", "c2", None, 5),
        ];
        let grouping = group_visits_by_customer(&visits);
        assert_eq!(grouping.customer_ids(), vec!["c2", "c1"]);
        let c2: Vec<&str> = grouping.customers[0]
            .visits
            .iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(c2, vec!["v3", "v1"]);
        assert_eq!(grouping.customers[0].name, "c2-name");
        assert_eq!(grouping.visit_ids(), vec!["v3", "v1", "v2"]);
    }

    #[test]
    fn missing_profile_name_falls_back_to_unknown() {
        let mut v = visit("v1", "c1", None, 1);
        v.customer_name = None;
        let grouping = group_visits_by_customer(&[v]);
        assert_eq!(grouping.customers[0].name, UNKNOWN_CUSTOMER_NAME);
    }

    #[test]
    fn visits_without_customer_are_dropped() {
        let visits = vec![visit("v1", "", None, 1), visit("", "c1", None, 2)];
        let grouping = group_visits_by_customer(&visits);
        assert!(grouping.is_empty());
        assert!(grouping.visit_customers.is_empty());
    }

    #[test]
    fn usage_falls_back_to_visit_staff() {
        let visits = vec![visit("v1", "c1", Some("st-visit"), 1)];
        let grouping = group_visits_by_customer(&visits);
        let rows = vec![
            usage("v1", Some("svc-a"), None),
            usage("v1", Some("svc-b"), Some("st-own")),
        ];
        let index = group_services_by_customer(&rows, &grouping);
        let agg = &index.aggregations["c1"];
        let staff: Vec<(&str, usize)> = agg.staff_counts.iter().collect();
        assert_eq!(staff, vec![("st-visit", 1), ("st-own", 1)]);
        assert_eq!(agg.service_counts.total(), 2);
        assert_eq!(index.service_ids, vec!["svc-a", "svc-b"]);
        assert_eq!(index.staff_ids, vec!["st-visit", "st-own"]);
    }

    #[test]
    fn usage_for_unknown_visit_is_dropped() {
        let grouping = group_visits_by_customer(&[visit("v1", "c1", None, 1)]);
        let rows = vec![usage("v-orphan", Some("svc-a"), Some("st-1"))];
        let index = group_services_by_customer(&rows, &grouping);
        assert!(index.aggregations.is_empty());
        assert!(index.service_ids.is_empty());
        assert!(index.staff_ids.is_empty());
    }

    #[test]
    fn usage_without_service_or_staff_still_creates_empty_aggregate() {
        let grouping = group_visits_by_customer(&[visit("v1", "c1", None, 1)]);
        let index = group_services_by_customer(&[usage("v1", None, None)], &grouping);
        let agg = &index.aggregations["c1"];
        assert_eq!(agg.service_counts.most_frequent(), None);
        assert_eq!(agg.staff_counts.most_frequent(), None);
    }

    #[test]
    fn empty_inputs_yield_empty_outputs() {
        let grouping = group_visits_by_customer(&[]);
        let index = group_services_by_customer(&[], &grouping);
        assert!(grouping.is_empty());
        assert!(index.aggregations.is_empty());
    }
}
