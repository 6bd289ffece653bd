// gallery.rs: Captured meal photos, newest first, mirrored to the store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{load_collection, persist_collection, DurableStore};

/// One captured photo and, once the vision call resolves, its analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Session-local handle used to attach an analysis to its scan.
    /// Reassigned on every load; not persisted.
    #[serde(skip)]
    pub id: u64,
    /// Self-contained `data:image/jpeg;base64,...` reference.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default)]
    pub captured_at: String,
}

impl ScanRecord {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            id: 0,
            image: image.into(),
            analysis: None,
            captured_at: now_iso(),
        }
    }
}

impl PartialEq for ScanRecord {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
            && self.analysis == other.analysis
            && self.captured_at == other.captured_at
    }
}

/// Older history is a bare array of data-URL strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredScan {
    Record(ScanRecord),
    Legacy(String),
}

impl From<StoredScan> for ScanRecord {
    fn from(stored: StoredScan) -> Self {
        match stored {
            StoredScan::Record(record) => record,
            StoredScan::Legacy(image) => ScanRecord {
                id: 0,
                image,
                analysis: None,
                captured_at: String::new(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GalleryError {
    #[error("No scan at position {index} (gallery has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

pub struct ScanGallery {
    store: Arc<dyn DurableStore>,
    key: String,
    records: Vec<ScanRecord>,
    next_id: u64,
}

impl ScanGallery {
    pub fn load(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut records: Vec<ScanRecord> = load_collection::<StoredScan>(store.as_ref(), &key)
            .into_iter()
            .map(ScanRecord::from)
            .collect();
        for (i, record) in records.iter_mut().enumerate() {
            record.id = i as u64 + 1;
        }
        let next_id = records.len() as u64 + 1;
        log::info!("ScanGallery: loaded {} scans from {}", records.len(), key);
        Self {
            store,
            key,
            records,
            next_id,
        }
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: u64) -> Option<&ScanRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insert at the front, persist, and return the record's id.
    pub fn insert_front(&mut self, mut record: ScanRecord) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        record.id = id;
        self.records.insert(0, record);
        self.persist();
        id
    }

    /// Remove the scan at `index`, keeping the others in order.
    pub fn remove_at(&mut self, index: usize) -> Result<ScanRecord, GalleryError> {
        if index >= self.records.len() {
            return Err(GalleryError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Attach `analysis` to scan `id`. Returns false if that scan was deleted.
    pub fn set_analysis(&mut self, id: u64, analysis: impl Into<String>) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.analysis = Some(analysis.into());
                self.persist();
                true
            }
            None => {
                log::warn!("ScanGallery: scan {id} was removed before its analysis arrived");
                false
            }
        }
    }

    pub fn persist(&self) {
        if let Err(e) = persist_collection(self.store.as_ref(), &self.key, &self.records) {
            log::error!("ScanGallery: failed to persist {}: {}", self.key, e);
        }
    }
}

/// Current UTC time as an ISO-8601 string.
pub fn now_iso() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let t = secs % 86400;
    let (y, m, d) = epoch_days_to_ymd(days as i64);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        y,
        m,
        d,
        t / 3600,
        (t % 3600) / 60,
        t % 60,
        dur.subsec_millis()
    )
}

/// Convert days since Unix epoch (1970-01-01) to (year, month, day).
pub fn epoch_days_to_ymd(mut days: i64) -> (i64, u32, u32) {
    // Shift epoch from 1970-01-01 to 0000-03-01 for easier leap-year math.
    days += 719_468;
    let era = if days >= 0 { days } else { days - 146_096 } / 146_097;
    let doe = (days - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
