//! Record store gateway: filter-to-predicate translation and seeding.

use crate::db::{Predicate, RecordStore};
use crate::error::{GatewayError, GatewayResult, StoreError};
use crate::seed;
use std::sync::Arc;
use survey_data_types::*;

/// Records returned by a list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub count: usize,
    pub records: Vec<SurveyRecord>,
}

impl From<Vec<SurveyRecord>> for RecordSet {
    fn from(records: Vec<SurveyRecord>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

pub struct Gateway {
    store: Arc<dyn RecordStore>,
}

impl Gateway {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> GatewayResult<RecordSet> {
        let records = self
            .store
            .find(&Predicate::all())
            .map_err(|e| store_failure("list_all", e))?;
        Ok(records.into())
    }

    /// AND across fields, OR within a field. Absent or empty sets are ignored.
    pub fn list_filtered(&self, filter: &RecordFilter) -> GatewayResult<RecordSet> {
        let predicate = build_predicate(filter);
        if predicate.is_empty() {
            return self.list_all();
        }
        log::debug!("Querying records with {:?}", predicate);
        let records = self
            .store
            .find(&predicate)
            .map_err(|e| store_failure("list_filtered", e))?;
        Ok(records.into())
    }

    /// Insert `records` in order. No dedup; validation runs over the whole
    /// batch before anything is written.
    pub fn seed(&self, records: &[NewSurveyRecord]) -> GatewayResult<usize> {
        validate_records(records)?;
        let inserted = self
            .store
            .insert_many(records)
            .map_err(|e| store_failure("seed", e))?;
        log::info!("Successfully seeded {} records", inserted.len());
        Ok(inserted.len())
    }

    /// Seed the default dataset only when the store is empty. Any existing
    /// record, relevant or not, counts as already seeded.
    pub fn ensure_seeded(&self) -> GatewayResult<usize> {
        let defaults = seed::default_records();
        validate_records(&defaults)?;

        let current = self
            .store
            .count()
            .map_err(|e| store_failure("ensure_seeded", e))?;
        log::info!("Current record count: {}", current);
        if current > 0 {
            return Ok(0);
        }

        // The count above is informational; insert_if_empty re-checks atomically.
        let inserted = self
            .store
            .insert_if_empty(&defaults)
            .map_err(|e| store_failure("ensure_seeded", e))?;
        if inserted > 0 {
            log::info!("No existing data found, seeded {} default records", inserted);
        }
        Ok(inserted)
    }

    /// Drop every record and write the default dataset.
    pub fn reseed(&self) -> GatewayResult<usize> {
        let defaults = seed::default_records();
        validate_records(&defaults)?;
        let inserted = self
            .store
            .replace_all(&defaults)
            .map_err(|e| store_failure("reseed", e))?;
        log::info!("Reseeded store with {} default records", inserted);
        Ok(inserted)
    }
}

pub fn build_predicate(filter: &RecordFilter) -> Predicate {
    RecordField::ALL
        .iter()
        .fold(Predicate::all(), |predicate, field| match filter.values(*field) {
            Some(values) => predicate.with_in(*field, values),
            None => predicate,
        })
}

pub fn validate_records(records: &[NewSurveyRecord]) -> GatewayResult<()> {
    for record in records {
        for field in RecordField::ALL {
            let value = record.value(field);
            if !field.accepts(value) {
                return Err(GatewayError::ValidationFailure {
                    field,
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn store_failure(operation: &'static str, source: StoreError) -> GatewayError {
    log::error!("Store failure during {}: {}", operation, source);
    GatewayError::StoreFailure { operation, source }
}
