//! SQLite-backed record store for survey entries.

use crate::error::{StoreError, StoreResult};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use survey_data_types::*;

/// Conjunction of per-field membership clauses. No clauses matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<(RecordField, Vec<String>)>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to be one of `values`. An empty set is ignored.
    pub fn with_in(mut self, field: RecordField, values: &[String]) -> Self {
        if !values.is_empty() {
            self.clauses.push((field, values.to_vec()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[cfg(test)]
    pub fn matches(&self, record: &SurveyRecord) -> bool {
        self.clauses
            .iter()
            .all(|(field, values)| values.iter().any(|v| v == record.value(*field)))
    }

    /// Render as a SQL `WHERE` body plus one JSON array parameter per clause.
    /// Binding arrays keeps the statement under SQLite's variable limit no
    /// matter how many values a clause carries.
    fn to_sql(&self) -> StoreResult<(String, Vec<String>)> {
        let mut conditions = vec!["1=1".to_string()];
        let mut params: Vec<String> = Vec::new();

        for (field, values) in &self.clauses {
            let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            params.push(serde_json::to_string(&distinct)?);
            conditions.push(format!(
                "{} IN (SELECT value FROM json_each(?{}))",
                field.as_str(),
                params.len()
            ));
        }

        Ok((conditions.join(" AND "), params))
    }
}

/// The document store boundary the gateway talks to.
pub trait RecordStore: Send + Sync {
    fn insert_many(&self, records: &[NewSurveyRecord]) -> StoreResult<Vec<SurveyRecord>>;
    fn find(&self, predicate: &Predicate) -> StoreResult<Vec<SurveyRecord>>;
    fn count(&self) -> StoreResult<i64>;
    fn delete_all(&self) -> StoreResult<usize>;

    /// Insert only if the store holds no records. Returns the number inserted
    /// (0 when the store was non-empty). The default is a plain count-then-insert
    /// and can race with a concurrent caller; stores with transactions override it.
    fn insert_if_empty(&self, records: &[NewSurveyRecord]) -> StoreResult<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }
        Ok(self.insert_many(records)?.len())
    }

    /// Delete everything, then insert `records`.
    fn replace_all(&self, records: &[NewSurveyRecord]) -> StoreResult<usize> {
        self.delete_all()?;
        Ok(self.insert_many(records)?.len())
    }
}

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_tables(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        // Domain checks ignore case; the stored text keeps whatever casing was written.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS survey_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                age TEXT NOT NULL CHECK (LOWER(age) IN ('18-24', '25-34', '35-44')),
                gender TEXT NOT NULL CHECK (LOWER(gender) IN ('male', 'female', 'other')),
                location TEXT NOT NULL
                    CHECK (LOWER(location) IN ('north america', 'europe', 'asia')),
                device TEXT NOT NULL CHECK (LOWER(device) IN ('mobile', 'desktop', 'tablet')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl RecordStore for Db {
    fn insert_many(&self, records: &[NewSurveyRecord]) -> StoreResult<Vec<SurveyRecord>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = insert_rows(&tx, records)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn find(&self, predicate: &Predicate) -> StoreResult<Vec<SurveyRecord>> {
        let conn = self.lock()?;
        let (where_clause, params) = predicate.to_sql()?;
        let sql = format!(
            "SELECT id, age, gender, location, device, created_at, updated_at
             FROM survey_records
             WHERE {}
             ORDER BY id ASC",
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(params), |row| row_to_record(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn count(&self) -> StoreResult<i64> {
        let conn = self.lock()?;
        Ok(count_rows(&conn)?)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM survey_records", [])?)
    }

    fn insert_if_empty(&self, records: &[NewSurveyRecord]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if count_rows(&tx)? > 0 {
            return Ok(0);
        }
        let inserted = insert_rows(&tx, records)?;
        tx.commit()?;
        Ok(inserted.len())
    }

    fn replace_all(&self, records: &[NewSurveyRecord]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM survey_records", [])?;
        let inserted = insert_rows(&tx, records)?;
        tx.commit()?;
        Ok(inserted.len())
    }
}

fn count_rows(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM survey_records", [], |r| r.get(0))
}

fn insert_rows(
    conn: &Connection,
    records: &[NewSurveyRecord],
) -> rusqlite::Result<Vec<SurveyRecord>> {
    let mut stmt = conn.prepare(
        "INSERT INTO survey_records (age, gender, location, device, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )?;

    let mut inserted = Vec::with_capacity(records.len());
    for record in records {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let id = stmt.insert(rusqlite::params![
            record.age,
            record.gender,
            record.location,
            record.device,
            now,
        ])?;
        inserted.push(SurveyRecord {
            id,
            age: record.age.clone(),
            gender: record.gender.clone(),
            location: record.location.clone(),
            device: record.device.clone(),
            created_at: now.clone(),
            updated_at: now,
        });
    }
    Ok(inserted)
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SurveyRecord> {
    Ok(SurveyRecord {
        id: row.get(0)?,
        age: row.get(1)?,
        gender: row.get(2)?,
        location: row.get(3)?,
        device: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Store whose every call fails.
#[cfg(test)]
pub struct BrokenStore;

#[cfg(test)]
impl RecordStore for BrokenStore {
    fn insert_many(&self, _: &[NewSurveyRecord]) -> StoreResult<Vec<SurveyRecord>> {
        Err(StoreError::LockPoisoned)
    }
    fn find(&self, _: &Predicate) -> StoreResult<Vec<SurveyRecord>> {
        Err(StoreError::LockPoisoned)
    }
    fn count(&self) -> StoreResult<i64> {
        Err(StoreError::LockPoisoned)
    }
    fn delete_all(&self) -> StoreResult<usize> {
        Err(StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<NewSurveyRecord> {
        vec![
            NewSurveyRecord::new("18-24", "Male", "Asia", "Mobile"),
            NewSurveyRecord::new("35-44", "Female", "Europe", "Tablet"),
        ]
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_insert_assigns_ids_and_timestamps() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        let inserted = db.insert_many(&sample()).unwrap();
        assert_eq!(inserted.len(), 2);
        assert!(inserted[0].id < inserted[1].id);
        assert_eq!(inserted[0].created_at, inserted[0].updated_at);
        assert!(inserted[0].created_at.ends_with('Z'));
        assert_eq!(db.count().unwrap(), 2);
        assert_eq!(db.find(&Predicate::all()).unwrap(), inserted);
    }

    #[test]
    fn test_find_with_predicate() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        db.insert_many(&sample()).unwrap();

        let predicate = Predicate::all().with_in(RecordField::Location, &strings(&["Europe", "Asia"]));
        assert_eq!(db.find(&predicate).unwrap().len(), 2);

        let predicate = predicate.with_in(RecordField::Device, &strings(&["Tablet"]));
        let found = db.find(&predicate).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].age, "35-44");
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        db.insert_many(&[NewSurveyRecord::new("25-34", "male", "Europe", "Desktop")])
            .unwrap();

        let upper = Predicate::all().with_in(RecordField::Gender, &strings(&["Male"]));
        assert!(db.find(&upper).unwrap().is_empty());
        let lower = Predicate::all().with_in(RecordField::Gender, &strings(&["male"]));
        assert_eq!(db.find(&lower).unwrap().len(), 1);
    }

    #[test]
    fn test_schema_rejects_out_of_domain_values() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        let result = db.insert_many(&[
            NewSurveyRecord::new("18-24", "Male", "Asia", "Mobile"),
            NewSurveyRecord::new("18-24", "Robot", "Asia", "Mobile"),
        ]);
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        // The whole batch is rolled back.
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_find_with_more_values_than_sqlite_variables() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        db.insert_many(&sample()).unwrap();

        let mut ages: Vec<String> = (0..40_000).map(|i| format!("age-{}", i)).collect();
        let misses = Predicate::all().with_in(RecordField::Age, &ages);
        assert!(db.find(&misses).unwrap().is_empty());

        ages.push("35-44".to_string());
        ages.push("35-44".to_string());
        let hits = Predicate::all().with_in(RecordField::Age, &ages);
        let found = db.find(&hits).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].gender, "Female");
    }

    #[test]
    fn test_find_with_quotes_in_values() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        db.insert_many(&sample()).unwrap();
        let predicate =
            Predicate::all().with_in(RecordField::Location, &strings(&["Asia", "O'Brien \"x\""]));
        assert_eq!(db.find(&predicate).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_if_empty() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        assert_eq!(db.insert_if_empty(&sample()).unwrap(), 2);
        assert_eq!(db.insert_if_empty(&sample()).unwrap(), 0);
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_replace_all_and_delete_all() {
        let db = Db::open(":memory:").expect("Failed to create test db");
        db.insert_many(&sample()).unwrap();
        db.insert_many(&sample()).unwrap();

        assert_eq!(db.replace_all(&sample()[..1]).unwrap(), 1);
        assert_eq!(db.count().unwrap(), 1);

        assert_eq!(db.delete_all().unwrap(), 1);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_predicate_matches_mirrors_sql() {
        let record = SurveyRecord {
            id: 1,
            age: "18-24".into(),
            gender: "Male".into(),
            location: "Asia".into(),
            device: "Mobile".into(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(Predicate::all().matches(&record));
        assert!(Predicate::all()
            .with_in(RecordField::Age, &strings(&["18-24", "25-34"]))
            .matches(&record));
        assert!(!Predicate::all()
            .with_in(RecordField::Age, &strings(&["18-24"]))
            .with_in(RecordField::Device, &strings(&["Tablet"]))
            .matches(&record));
        assert!(Predicate::all().with_in(RecordField::Age, &[]).is_empty());
    }
}
