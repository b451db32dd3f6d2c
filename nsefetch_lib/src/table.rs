//! Announcement rows reshaped into a table indexed and sorted by `an_dt`.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::NseFetchError;

/// Name of the announcement timestamp field and of the table index.
pub const INDEX_COLUMN: &str = "an_dt";

/// Index format used when the table is written out.
pub const INDEX_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y"];

/// Why a payload could not be turned into a table.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("payload is not a list")]
    NotAList,
    #[error("payload is empty")]
    Empty,
    #[error("row {0} is not an object")]
    NotAnObject(usize),
    #[error("row {0} has no `an_dt` field")]
    MissingTimestamp(usize),
    #[error("row {row} has an unreadable `an_dt`: {value}")]
    BadTimestamp { row: usize, value: String },
}

/// One announcement. `fields` holds every remote field except `an_dt`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnouncementRow {
    pub an_dt: NaiveDateTime,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AnnouncementRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Field as text: strings verbatim, null as empty, anything else as JSON.
    pub fn text(&self, column: &str) -> String {
        if column == INDEX_COLUMN {
            return self.an_dt.format(INDEX_FORMAT).to_string();
        }
        match self.fields.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Announcements ordered by `an_dt`, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnnouncementTable {
    columns: Vec<String>,
    rows: Vec<AnnouncementRow>,
}

impl AnnouncementTable {
    /// Builds a table from a JSON array of objects. Every row needs a
    /// readable `an_dt`; rows with equal timestamps keep their input order.
    pub fn from_value(payload: Value) -> Result<Self, TableError> {
        match payload {
            Value::Array(records) => Self::from_records(records),
            _ => Err(TableError::NotAList),
        }
    }

    pub fn from_records(records: Vec<Value>) -> Result<Self, TableError> {
        if records.is_empty() {
            return Err(TableError::Empty);
        }

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let mut fields = match record {
                Value::Object(fields) => fields,
                _ => return Err(TableError::NotAnObject(i)),
            };
            let raw = fields
                .remove(INDEX_COLUMN)
                .ok_or(TableError::MissingTimestamp(i))?;
            let an_dt = parse_timestamp(&raw).ok_or_else(|| TableError::BadTimestamp {
                row: i,
                value: raw.to_string(),
            })?;
            rows.push(AnnouncementRow { an_dt, fields });
        }
        rows.sort_by_key(|r| r.an_dt);

        let columns = column_order(&rows);
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[AnnouncementRow] {
        &self.rows
    }

    /// The `an_dt` index, ascending.
    pub fn index(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.an_dt).collect()
    }

    /// Data columns (index excluded), in order of first appearance.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    pub fn first(&self) -> Option<&AnnouncementRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&AnnouncementRow> {
        self.rows.last()
    }

    /// Rows whose index falls within `from ..= to`.
    pub fn between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<&AnnouncementRow> {
        let start = self.rows.partition_point(|r| r.an_dt < from);
        let end = self.rows.partition_point(|r| r.an_dt <= to);
        self.rows[start..end.max(start)].iter().collect()
    }

    /// Copy of the table restricted to `names`, in the given order. Unknown
    /// names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let columns: Vec<String> = names
            .iter()
            .filter(|n| self.columns.iter().any(|c| c.as_str() == **n))
            .map(|n| n.to_string())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| AnnouncementRow {
                an_dt: r.an_dt,
                fields: columns
                    .iter()
                    .filter_map(|c| r.fields.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }

    /// Writes the table as CSV, index first.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec![INDEX_COLUMN];
        header.extend(self.columns.iter().map(String::as_str));
        wtr.write_record(&header)?;
        for row in self.rows.iter() {
            let mut record = vec![row.text(INDEX_COLUMN)];
            record.extend(self.columns.iter().map(|c| row.text(c)));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: impl AsRef<Path>) -> Result<(), NseFetchError> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(io::BufWriter::new(file))?;
        Ok(())
    }
}

fn column_order(rows: &[AnnouncementRow]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();
    for row in rows.iter() {
        for key in row.fields.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Reads an `an_dt` value: NSE's `02-Mar-2024 18:30:12`, ISO-8601 with or
/// without offset, or a bare date (midnight).
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(&json!(s)).unwrap()
    }

    #[test]
    fn rows_are_sorted_ascending() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "2024-03-02", "symbol": "B"},
            {"an_dt": "2024-03-01", "symbol": "A"},
        ]))
        .unwrap();
        assert_eq!(table.index(), vec![ts("2024-03-01"), ts("2024-03-02")]);
        assert_eq!(table.rows()[0].text("symbol"), "A");
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "01-Mar-2024 10:00:00", "seq": 1},
            {"an_dt": "29-Feb-2024 10:00:00", "seq": 0},
            {"an_dt": "01-Mar-2024 10:00:00", "seq": 2},
        ]))
        .unwrap();
        let seqs: Vec<_> = table.column("seq").into_iter().flatten().cloned().collect();
        assert_eq!(seqs, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn parses_nse_and_iso_timestamps() {
        assert_eq!(
            ts("02-Mar-2024 18:30:12"),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(18, 30, 12).unwrap()
        );
        assert_eq!(ts("2024-03-02 18:30:12"), ts("02-Mar-2024 18:30:12"));
        assert_eq!(ts("2024-03-02T18:30:12+05:30"), ts("02-Mar-2024 18:30:12"));
        assert_eq!(ts("02-03-2024"), ts("2024-03-02"));
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(1709400000)).is_none());
    }

    #[test]
    fn rejects_payloads_that_are_not_tables() {
        assert_eq!(AnnouncementTable::from_value(json!([])), Err(TableError::Empty));
        assert_eq!(
            AnnouncementTable::from_value(json!({"data": []})),
            Err(TableError::NotAList)
        );
        assert_eq!(
            AnnouncementTable::from_value(json!([{"an_dt": "2024-03-01"}, "x"])),
            Err(TableError::NotAnObject(1))
        );
        assert_eq!(
            AnnouncementTable::from_value(json!([{"symbol": "A"}])),
            Err(TableError::MissingTimestamp(0))
        );
        assert!(matches!(
            AnnouncementTable::from_value(json!([{"an_dt": "soon"}])),
            Err(TableError::BadTimestamp { row: 0, .. })
        ));
    }

    #[test]
    fn columns_follow_first_appearance() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "2024-03-01", "desc": "x", "symbol": "A"},
            {"an_dt": "2024-03-02", "attchmntFile": "f", "symbol": "B"},
        ]))
        .unwrap();
        assert_eq!(table.columns(), ["desc", "symbol", "attchmntFile"]);
        assert_eq!(table.column("attchmntFile"), vec![None, Some(&json!("f"))]);
    }

    #[test]
    fn select_keeps_requested_columns() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "2024-03-01", "desc": "x", "symbol": "A", "seq_id": "1"},
        ]))
        .unwrap();
        let narrow = table.select(&["symbol", "missing", "desc"]);
        assert_eq!(narrow.columns(), ["symbol", "desc"]);
        assert_eq!(narrow.rows()[0].fields.len(), 2);
        assert_eq!(narrow.index(), table.index());
    }

    #[test]
    fn between_slices_by_index() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "2024-03-01"},
            {"an_dt": "2024-03-02"},
            {"an_dt": "2024-03-03"},
        ]))
        .unwrap();
        let mid = table.between(ts("2024-03-02"), ts("2024-03-03"));
        assert_eq!(mid.len(), 2);
        assert!(table.between(ts("2024-03-03"), ts("2024-03-01")).is_empty());
    }

    #[test]
    fn csv_has_index_first() {
        let table = AnnouncementTable::from_value(json!([
            {"an_dt": "02-Mar-2024 18:30:12", "symbol": "INFY", "desc": "Updates, misc"},
            {"an_dt": "01-Mar-2024 09:15:01", "symbol": "INFY", "desc": null},
        ]))
        .unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "an_dt,desc,symbol\n\
             2024-03-01 09:15:01,,INFY\n\
             2024-03-02 18:30:12,\"Updates, misc\",INFY\n"
        );
    }
}
