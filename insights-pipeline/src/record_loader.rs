//! CSV record loader and in-memory collaborator.
//!
//! A data directory holds one CSV file per record kind:
//!   visits.csv         tenant_id, id, customer_id, customer_name, staff_id, created_at, status
//!   reviews.csv        tenant_id, customer_id, rating
//!   service_usage.csv  tenant_id, visit_id, service_id, staff_id
//!   staff.csv          id, name
//!   services.csv       id, name
//!
//! Only visits.csv is required. Rows are validated once here; everything
//! downstream works on typed records.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::collaborators::{NameResolver, RecordFetcher, ResolvedNames};
use crate::error::{InsightsError, InsightsResult};
use crate::types::{ReviewRecord, ServiceUsageRecord, VisitRecord, VisitStatus};

pub const VISITS_FILE: &str = "visits.csv";
pub const REVIEWS_FILE: &str = "reviews.csv";
pub const SERVICE_USAGE_FILE: &str = "service_usage.csv";
pub const STAFF_FILE: &str = "staff.csv";
pub const SERVICES_FILE: &str = "services.csv";

/// Highest accepted review rating.
const MAX_RATING: f64 = 5.0;

/// A record tagged with the tenant it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantRecord<T> {
    pub tenant_id: String,
    pub record: T,
}

#[derive(Debug, Deserialize)]
struct VisitRow {
    tenant_id: String,
    id: String,
    customer_id: String,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    staff_id: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    tenant_id: String,
    customer_id: String,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct ServiceUsageRow {
    tenant_id: String,
    visit_id: String,
    #[serde(default)]
    service_id: Option<String>,
    #[serde(default)]
    staff_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    id: String,
    name: String,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Deserialize every row, reporting the 1-based file line on failure.
fn read_rows<R: Read, T: for<'de> Deserialize<'de>>(reader: R, source_name: &str) -> InsightsResult<Vec<(usize, T)>> {
    let mut rows = Vec::new();
    for (idx, result) in csv_reader(reader).deserialize().enumerate() {
        let line = idx + 2;
        let row: T = result.map_err(|e| InsightsError::InvalidRecord {
            source_name: source_name.to_string(),
            line,
            reason: e.to_string(),
        })?;
        rows.push((line, row));
    }
    Ok(rows)
}

fn invalid(source_name: &str, line: usize, reason: &str) -> InsightsError {
    InsightsError::InvalidRecord {
        source_name: source_name.to_string(),
        line,
        reason: reason.to_string(),
    }
}

/// Empty strings from the CSV mean "absent".
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn load_visits<R: Read>(reader: R) -> InsightsResult<Vec<TenantRecord<VisitRecord>>> {
    read_rows::<_, VisitRow>(reader, VISITS_FILE)?
        .into_iter()
        .map(|(line, row)| {
            if row.id.is_empty() {
                return Err(invalid(VISITS_FILE, line, "visit id is empty"));
            }
            if row.customer_id.is_empty() {
                return Err(invalid(VISITS_FILE, line, "customer_id is empty"));
            }
            Ok(TenantRecord {
                tenant_id: row.tenant_id,
                record: VisitRecord {
                    id: row.id,
                    customer_id: row.customer_id,
                    customer_name: present(row.customer_name),
                    staff_id: present(row.staff_id),
                    created_at: row.created_at,
                    status: VisitStatus::parse(&row.status),
                },
            })
        })
        .collect()
}

pub fn load_reviews<R: Read>(reader: R) -> InsightsResult<Vec<TenantRecord<ReviewRecord>>> {
    read_rows::<_, ReviewRow>(reader, REVIEWS_FILE)?
        .into_iter()
        .map(|(line, row)| {
            if !(0.0..=MAX_RATING).contains(&row.rating) {
                return Err(invalid(
                    REVIEWS_FILE,
                    line,
                    &format!("rating {} outside 0..={}", row.rating, MAX_RATING),
                ));
            }
            Ok(TenantRecord {
                tenant_id: row.tenant_id,
                record: ReviewRecord {
                    customer_id: row.customer_id,
                    rating: row.rating,
                },
            })
        })
        .collect()
}

pub fn load_service_usage<R: Read>(reader: R) -> InsightsResult<Vec<TenantRecord<ServiceUsageRecord>>> {
    Ok(read_rows::<_, ServiceUsageRow>(reader, SERVICE_USAGE_FILE)?
        .into_iter()
        .map(|(_, row)| TenantRecord {
            tenant_id: row.tenant_id,
            record: ServiceUsageRecord {
                visit_id: row.visit_id,
                service_id: present(row.service_id),
                staff_id: present(row.staff_id),
            },
        })
        .collect())
}

pub fn load_names<R: Read>(reader: R, source_name: &str) -> InsightsResult<HashMap<String, String>> {
    Ok(read_rows::<_, NameRow>(reader, source_name)?
        .into_iter()
        .map(|(_, row)| (row.id, row.name))
        .collect())
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("expected timestamp, got '{}'", s)))
}

/// Tenant-scoped records held in memory; serves as both collaborators.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecords {
    pub visits: Vec<TenantRecord<VisitRecord>>,
    pub reviews: Vec<TenantRecord<ReviewRecord>>,
    pub service_usage: Vec<TenantRecord<ServiceUsageRecord>>,
    pub staff_names: HashMap<String, String>,
    pub service_names: HashMap<String, String>,
}

impl InMemoryRecords {
    /// Load a data directory laid out as described in the module docs.
    pub fn load_dir(dir: impl AsRef<Path>) -> InsightsResult<Self> {
        let dir = dir.as_ref();
        let visits = load_visits(open(&dir.join(VISITS_FILE))?)?;
        let reviews = match open_optional(&dir.join(REVIEWS_FILE))? {
            Some(file) => load_reviews(file)?,
            None => Vec::new(),
        };
        let service_usage = match open_optional(&dir.join(SERVICE_USAGE_FILE))? {
            Some(file) => load_service_usage(file)?,
            None => Vec::new(),
        };
        let staff_names = match open_optional(&dir.join(STAFF_FILE))? {
            Some(file) => load_names(file, STAFF_FILE)?,
            None => HashMap::new(),
        };
        let service_names = match open_optional(&dir.join(SERVICES_FILE))? {
            Some(file) => load_names(file, SERVICES_FILE)?,
            None => HashMap::new(),
        };

        log::info!(
            "loaded {} visits, {} reviews, {} service usage rows from {}",
            visits.len(),
            reviews.len(),
            service_usage.len(),
            dir.display()
        );

        Ok(Self {
            visits,
            reviews,
            service_usage,
            staff_names,
            service_names,
        })
    }

    /// Distinct tenant ids in visit order of first appearance.
    pub fn tenant_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.visits
            .iter()
            .filter(|v| seen.insert(v.tenant_id.as_str()))
            .map(|v| v.tenant_id.clone())
            .collect()
    }
}

fn open(path: &Path) -> InsightsResult<std::fs::File> {
    std::fs::File::open(path).map_err(|e| InsightsError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn open_optional(path: &Path) -> InsightsResult<Option<std::fs::File>> {
    if path.exists() {
        open(path).map(Some)
    } else {
        Ok(None)
    }
}

#[async_trait]
impl RecordFetcher for InMemoryRecords {
    async fn fetch_visits(&self, tenant_id: &str) -> InsightsResult<Vec<VisitRecord>> {
        let mut visits: Vec<VisitRecord> = self
            .visits
            .iter()
            .filter(|v| v.tenant_id == tenant_id)
            .map(|v| v.record.clone())
            .collect();
        visits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visits)
    }

    async fn fetch_reviews(
        &self,
        tenant_id: &str,
        customer_ids: &[String],
    ) -> InsightsResult<Vec<ReviewRecord>> {
        let wanted: HashSet<&str> = customer_ids.iter().map(String::as_str).collect();
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.tenant_id == tenant_id && wanted.contains(r.record.customer_id.as_str()))
            .map(|r| r.record.clone())
            .collect())
    }

    async fn fetch_service_usage(
        &self,
        tenant_id: &str,
        visit_ids: &[String],
    ) -> InsightsResult<Vec<ServiceUsageRecord>> {
        let wanted: HashSet<&str> = visit_ids.iter().map(String::as_str).collect();
        Ok(self
            .service_usage
            .iter()
            .filter(|u| u.tenant_id == tenant_id && wanted.contains(u.record.visit_id.as_str()))
            .map(|u| u.record.clone())
            .collect())
    }
}

#[async_trait]
impl NameResolver for InMemoryRecords {
    async fn resolve_names(
        &self,
        staff_ids: &[String],
        service_ids: &[String],
    ) -> InsightsResult<ResolvedNames> {
        let pick = |ids: &[String], names: &HashMap<String, String>| {
            ids.iter()
                .filter_map(|id| names.get(id).map(|name| (id.clone(), name.clone())))
                .collect::<HashMap<_, _>>()
        };
        Ok(ResolvedNames {
            staff_names: pick(staff_ids, &self.staff_names),
            service_names: pick(service_ids, &self.service_names),
        })
    }
}
