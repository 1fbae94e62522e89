use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::DrawRecord;
use crate::error::LottoError;
use crate::fs_util::write_atomic;

pub const HEADER: [&str; 10] = [
    "year", "drawNo", "date", "n1", "n2", "n3", "n4", "n5", "n6", "bonus",
];

pub const DEFAULT_DATASET: &str = "draw_kor.csv";

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetRow {
    Draw(DrawRecord),
    /// A line that did not parse as a draw. Written back as read, after every draw.
    Unparsed(StringRecord),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = DrawRecord>) -> Self {
        Self {
            rows: records.into_iter().map(DatasetRow::Draw).collect(),
        }
    }

    /// Parses CSV text. `path` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, path: &Utf8Path) -> Result<Self, LottoError> {
        let read_err = |message: String| LottoError::DatasetRead {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut headers = reader
            .headers()
            .map_err(|err| read_err(err.to_string()))?
            .clone();
        if headers.is_empty() {
            return Ok(Self::new());
        }
        headers.trim();
        if !headers.iter().eq(HEADER.iter().copied()) {
            return Err(LottoError::DatasetHeader {
                path: path.to_path_buf(),
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| read_err(err.to_string()))?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let mut trimmed = record.clone();
            trimmed.trim();
            match trimmed.deserialize::<DrawRecord>(Some(&headers)) {
                Ok(draw) => rows.push(DatasetRow::Draw(draw)),
                Err(err) => {
                    debug!("keeping unparsed dataset row {:?}: {err}", record);
                    rows.push(DatasetRow::Unparsed(record));
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &DrawRecord> {
        self.rows.iter().filter_map(|row| match row {
            DatasetRow::Draw(record) => Some(record),
            DatasetRow::Unparsed(_) => None,
        })
    }

    pub fn get(&self, draw_no: u32) -> Option<&DrawRecord> {
        self.records().find(|record| record.draw_no == draw_no)
    }

    pub fn latest_round(&self) -> Option<u32> {
        self.records().map(|record| record.draw_no).max()
    }

    /// Upserts `incoming` keyed by draw number.
    ///
    /// Incoming records come first, so they win over rows already present; among
    /// incoming duplicates the first one wins. Unparsed rows are kept as they are.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = DrawRecord>) -> MergeStats {
        let incoming = incoming.into_iter().collect::<Vec<_>>();
        let mut stats = MergeStats::default();

        let mut existing = HashMap::<u32, &DrawRecord>::new();
        for record in self.records() {
            existing.entry(record.draw_no).or_insert(record);
        }
        let mut seen = HashSet::new();
        for record in &incoming {
            if !seen.insert(record.draw_no) {
                continue;
            }
            match existing.get(&record.draw_no) {
                None => stats.inserted += 1,
                Some(old) if *old == record => stats.unchanged += 1,
                Some(_) => stats.replaced += 1,
            }
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(incoming.len() + self.rows.len());
        let candidates = incoming
            .into_iter()
            .map(DatasetRow::Draw)
            .chain(self.rows.drain(..));
        for row in candidates {
            if let DatasetRow::Draw(record) = &row
                && !seen.insert(record.draw_no)
            {
                continue;
            }
            merged.push(row);
        }
        self.rows = merged;
        stats
    }

    /// Most recent draw first; unparsed rows keep their relative order at the end.
    pub fn sort(&mut self) {
        self.rows.sort_by_key(|row| match row {
            DatasetRow::Draw(record) => (false, Reverse(record.draw_no)),
            DatasetRow::Unparsed(_) => (true, Reverse(0)),
        });
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(HEADER)?;
        for row in &self.rows {
            match row {
                DatasetRow::Draw(record) => writer.serialize(record)?,
                DatasetRow::Unparsed(record) => writer.write_record(record)?,
            }
        }
        writer
            .into_inner()
            .map_err(|err| csv::Error::from(io::Error::other(err.to_string())))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub path: String,
    #[serde(flatten)]
    pub stats: MergeStats,
    pub total_rows: usize,
    pub latest_round: Option<u32>,
}

/// The dataset file on disk.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    path: Utf8PathBuf,
}

impl DatasetFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.as_std_path().exists()
    }

    /// Reads the dataset; a missing file is an empty dataset.
    pub fn load(&self) -> Result<Dataset, LottoError> {
        match fs::File::open(self.path.as_std_path()) {
            Ok(file) => Dataset::from_reader(file, &self.path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Dataset::new()),
            Err(err) => Err(LottoError::DatasetRead {
                path: self.path.clone(),
                message: err.to_string(),
            }),
        }
    }

    /// Highest round on disk, or 0 when the file is absent, empty or unreadable.
    pub fn latest_round(&self) -> u32 {
        match self.load() {
            Ok(dataset) => dataset.latest_round().unwrap_or(0),
            Err(err) => {
                warn!("{err}; assuming no rounds are known");
                0
            }
        }
    }

    pub fn save(&self, dataset: &Dataset) -> Result<(), LottoError> {
        self.save_with(dataset, write_atomic)
    }

    fn save_with<W>(&self, dataset: &Dataset, write: W) -> Result<(), LottoError>
    where
        W: FnOnce(&Utf8Path, &[u8]) -> Result<(), LottoError>,
    {
        let content = dataset.to_csv_bytes().map_err(|err| LottoError::DatasetWrite {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        write(&self.path, &content)
    }

    /// Load, upsert, sort and atomically write back.
    ///
    /// Nothing on disk changes unless the whole sequence succeeds.
    pub fn update(&self, records: &[DrawRecord]) -> Result<UpdateSummary, LottoError> {
        self.update_with(records, write_atomic)
    }

    fn update_with<W>(
        &self,
        records: &[DrawRecord],
        write: W,
    ) -> Result<UpdateSummary, LottoError>
    where
        W: FnOnce(&Utf8Path, &[u8]) -> Result<(), LottoError>,
    {
        let mut dataset = self.load()?;
        let stats = dataset.merge(records.iter().cloned());
        dataset.sort();
        self.save_with(&dataset, write)?;

        info!(
            "dataset {} updated: {} inserted, {} replaced, {} unchanged",
            self.path, stats.inserted, stats.replaced, stats.unchanged
        );
        Ok(UpdateSummary {
            path: self.path.to_string(),
            stats,
            total_rows: dataset.len(),
            latest_round: dataset.latest_round(),
        })
    }

    /// Creates a header-only dataset. Returns false when the file already exists.
    pub fn init(&self) -> Result<bool, LottoError> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&Dataset::new())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn record(draw_no: u32) -> DrawRecord {
        DrawRecord {
            year: 2024,
            draw_no,
            date: "2024-01-06".to_string(),
            n1: 1,
            n2: 2,
            n3: 3,
            n4: 4,
            n5: 5,
            n6: 6,
            bonus: 7,
        }
    }

    #[test]
    fn empty_input_is_empty_dataset() {
        let dataset = Dataset::from_reader("".as_bytes(), Utf8Path::new("x.csv")).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.latest_round(), None);
    }

    #[test]
    fn header_only_is_empty_dataset() {
        let text = "year,drawNo,date,n1,n2,n3,n4,n5,n6,bonus\n";
        let dataset = Dataset::from_reader(text.as_bytes(), Utf8Path::new("x.csv")).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn serialized_header_matches_constant() {
        let bytes = Dataset::from_records([record(5)]).to_csv_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "year,drawNo,date,n1,n2,n3,n4,n5,n6,bonus\n2024,5,2024-01-06,1,2,3,4,5,6,7\n"
        );
    }

    #[test]
    fn merge_counts() {
        let mut dataset = Dataset::from_records([record(1), record(2)]);
        let mut changed = record(2);
        changed.bonus = 40;
        let stats = dataset.merge([record(3), changed, record(1), record(3)]);
        assert_eq!(
            stats,
            MergeStats {
                inserted: 1,
                replaced: 1,
                unchanged: 1,
            }
        );
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get(2).unwrap().bonus, 40);
    }

    #[test]
    fn failed_write_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("draw_kor.csv")).unwrap();
        let file = DatasetFile::new(path);
        file.update(&[record(1)]).unwrap();
        let before = fs::read(file.path().as_std_path()).unwrap();

        // A regular file cannot be a parent directory, whatever the permissions.
        let result = file.update_with(&[record(2)], |target, content| {
            assert!(String::from_utf8_lossy(content).contains("2024,2,"));
            write_atomic(&target.join("nested.csv"), content)
        });

        assert_matches!(result, Err(LottoError::DatasetWrite { .. }));
        assert_eq!(fs::read(file.path().as_std_path()).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(file.latest_round(), 1);
    }
}
