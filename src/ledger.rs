use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::Path,
};

use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;

/// UTF-8 byte order mark, kept at the front of the ledger file so that
/// spreadsheet tools open it with the right encoding.
const BOM: &[u8] = b"\xef\xbb\xbf";

/// Column order of the ledger file, matching the field order of [`VideoRecord`]
const COLUMNS: [&str; 7] = [
    "class_id",
    "class",
    "video_id",
    "video_title",
    "video_url",
    "video_name",
    "download",
];

/// One row of the ledger.
///
/// A record is created by the collector when a search yields a new unseen
/// URL, and its `download` flag is set by the fetcher. Records are never
/// deleted, only marked: a row once marked downloaded is never re-attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub class_id: u32,
    pub class: String,
    /// Dense zero-based sequence number within the class,
    /// used only for stable ordering
    pub video_id: u32,
    pub video_title: String,
    pub video_url: String,
    /// Filesystem-safe stem used as the output filename.
    /// Empty when the ledger was written by tooling without the column.
    #[serde(default)]
    pub video_name: String,
    #[serde(default, deserialize_with = "loose_bool")]
    pub download: bool,
}

/// Accept `true`/`True`/`1` (other tooling capitalizes its booleans);
/// everything else, including an empty field, reads as false.
fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1"
    ))
}

/// The persistent table of all known video records across classes, used as
/// both search dedup memory and download resume memory.
///
/// The ledger is an explicit value passed through the pipeline stages.
/// Persistence happens only at the pipeline boundaries, always as a
/// whole-file rewrite.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<VideoRecord>,
}

impl Ledger {
    /// Read the ledger file, or create an empty one (with its header row)
    /// if it does not exist yet.
    pub fn read_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::read(path)
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .into_diagnostic()
                    .wrap_err("Could not create ledger parent directories")?;
            }
            let ledger = Self::default();
            ledger.save(path)?;
            Ok(ledger)
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read ledger file {}", path.display()))?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);

        let mut reader = csv::Reader::from_reader(bytes);
        let records = reader
            .deserialize::<VideoRecord>()
            .collect::<Result<Vec<_>, _>>()
            .into_diagnostic()
            .wrap_err("Ledger file is not a valid video record table")?;

        Ok(Self { records })
    }

    /// Whole-file atomic rewrite: write to a sibling temporary file,
    /// then rename it over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
            .into_diagnostic()
            .wrap_err("Could not create temporary ledger file")?;

        tmp.write_all(BOM).into_diagnostic()?;
        {
            let mut writer = csv::Writer::from_writer(&mut tmp);
            if self.records.is_empty() {
                // Serialization only emits the header alongside the first
                // record, write it by hand for an empty table
                writer.write_record(COLUMNS).into_diagnostic()?;
            }
            for record in &self.records {
                writer.serialize(record).into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }

        tmp.persist(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not persist ledger to {}", path.display()))?;
        Ok(())
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [VideoRecord] {
        &mut self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: VideoRecord) {
        self.records.push(record);
    }

    /// Restore the canonical `(class_id, video_id)` ordering after appends
    pub fn sort(&mut self) {
        self.records
            .sort_by(|a, b| (a.class_id, a.video_id).cmp(&(b.class_id, b.video_id)));
    }

    /// Pairs of `(video_title, video_url)` already recorded for the class.
    ///
    /// This pair is the identity key of a scraped search result: the search
    /// page does not expose a persistent video id.
    pub fn omit_pairs(&self, class_id: u32) -> HashSet<(String, String)> {
        self.records
            .iter()
            .filter(|r| r.class_id == class_id)
            .map(|r| (r.video_title.clone(), r.video_url.clone()))
            .collect()
    }

    pub fn class_len(&self, class_id: u32) -> usize {
        self.records
            .iter()
            .filter(|r| r.class_id == class_id)
            .count()
    }

    /// Next dense `video_id` for the class, continuing from the existing max
    pub fn next_video_id(&self, class_id: u32) -> u32 {
        self.records
            .iter()
            .filter(|r| r.class_id == class_id)
            .map(|r| r.video_id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Distinct `(class_id, class)` pairs, in ledger order
    pub fn classes(&self) -> Vec<(u32, String)> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.class_id))
            .map(|r| (r.class_id, r.class.clone()))
            .collect()
    }

    pub fn downloaded_in_class(&self, class_id: u32) -> usize {
        self.records
            .iter()
            .filter(|r| r.class_id == class_id && r.download)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tempfile::tempdir;

    use super::*;

    fn record(class_id: u32, video_id: u32) -> VideoRecord {
        VideoRecord {
            class_id,
            class: format!("class{class_id}"),
            video_id,
            video_title: format!("video {class_id}-{video_id}"),
            video_url: format!("https://example.com/{class_id}/{video_id}"),
            video_name: format!("vid_{class_id}_{video_id}"),
            download: false,
        }
    }

    #[test]
    fn read_or_create_initializes_an_empty_file_with_bom_and_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("annotations").join("urls.csv");

        let ledger = Ledger::read_or_create(&path).unwrap();
        assert!(ledger.is_empty());

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));

        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "class_id,class,video_id,video_title,video_url,video_name,download"
        );
    }

    #[test]
    fn save_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.csv");

        let mut ledger = Ledger::default();
        ledger.push(record(0, 0));
        ledger.push(VideoRecord {
            download: true,
            ..record(1, 0)
        });
        ledger.save(&path).unwrap();

        assert_eq!(Ledger::read(&path).unwrap(), ledger);
    }

    #[test]
    fn reads_a_ledger_without_name_and_download_columns() {
        let csv = indoc! {"
            class_id,class,video_id,video_title,video_url
            0,cat,0,A cat,https://example.com/a
        "};

        let ledger = Ledger::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ledger.records().len(), 1);
        assert_eq!(ledger.records()[0].video_name, "");
        assert!(!ledger.records()[0].download);
    }

    #[test]
    fn accepts_capitalized_booleans() {
        let csv = indoc! {"
            class_id,class,video_id,video_title,video_url,video_name,download
            0,cat,0,A cat,https://example.com/a,a,True
            0,cat,1,B cat,https://example.com/b,b,False
        "};

        let ledger = Ledger::from_bytes(csv.as_bytes()).unwrap();
        assert!(ledger.records()[0].download);
        assert!(!ledger.records()[1].download);
    }

    #[test]
    fn omit_pairs_and_counters_follow_the_class() {
        let mut ledger = Ledger::default();
        ledger.push(record(0, 0));
        ledger.push(record(0, 1));
        ledger.push(record(1, 0));

        assert_eq!(ledger.class_len(0), 2);
        assert_eq!(ledger.next_video_id(0), 2);
        assert_eq!(ledger.next_video_id(1), 1);
        assert_eq!(ledger.next_video_id(7), 0);

        let omit = ledger.omit_pairs(1);
        assert_eq!(omit.len(), 1);
        assert!(omit.contains(&(
            "video 1-0".to_string(),
            "https://example.com/1/0".to_string()
        )));
    }

    #[test]
    fn sort_orders_by_class_then_video() {
        let mut ledger = Ledger::default();
        ledger.push(record(1, 0));
        ledger.push(record(0, 1));
        ledger.push(record(0, 0));
        ledger.sort();

        let order: Vec<_> = ledger
            .records()
            .iter()
            .map(|r| (r.class_id, r.video_id))
            .collect();
        assert_eq!(order, [(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn classes_lists_distinct_pairs_in_order() {
        let mut ledger = Ledger::default();
        ledger.push(record(0, 0));
        ledger.push(record(0, 1));
        ledger.push(record(2, 0));

        assert_eq!(
            ledger.classes(),
            [(0, "class0".to_string()), (2, "class2".to_string())]
        );
    }
}
