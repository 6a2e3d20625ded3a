//! Key layout for the single ordered keyspace.
//!
//! All records share one lexicographically ordered namespace:
//!
//! ```text
//! doc/{id}                                     article record
//! queue/{date}/{id}                            unresolved work queue
//! sketch/{source_fp}/{hash}/{date}/{id}        one row per sketch component
//! state/{id}                                   resolution record
//! ```
//!
//! Dates are `%Y-%m-%d` so lexicographic key order equals chronological
//! order, and fingerprints/hashes are fixed-width hex. Date windows and
//! prefix lookups are therefore plain key-range scans.

use chrono::NaiveDate;

use crate::StoreError;

pub(crate) const QUEUE_PREFIX: &str = "queue/";

const DATE_FMT: &str = "%Y-%m-%d";

pub(crate) fn doc_key(id: &str) -> String {
    format!("doc/{id}")
}

pub(crate) fn state_key(id: &str) -> String {
    format!("state/{id}")
}

pub(crate) fn queue_key(date: NaiveDate, id: &str) -> String {
    format!("queue/{}/{id}", date.format(DATE_FMT))
}

pub(crate) fn sketch_key(source_fp: i64, hash: u64, date: NaiveDate, id: &str) -> String {
    format!(
        "sketch/{:016x}/{hash:016x}/{}/{id}",
        source_fp as u64,
        date.format(DATE_FMT)
    )
}

/// Key range covering every row of `(source_fp, hash)` with a publish date
/// in `[from, to]` inclusive, regardless of article id content.
pub(crate) fn sketch_range(
    source_fp: i64,
    hash: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> (String, String) {
    let base = format!("sketch/{:016x}/{hash:016x}/", source_fp as u64);
    let start = format!("{base}{}", from.format(DATE_FMT));
    let end = match to.succ_opt() {
        Some(next) => format!("{base}{}", next.format(DATE_FMT)),
        None => prefix_end(&base),
    };
    (start, end)
}

/// Smallest key strictly greater than every key carrying `prefix`.
/// Prefixes here are ASCII and never end in 0xFF.
pub(crate) fn prefix_end(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

pub(crate) fn parse_queue_key(key: &str) -> Result<(NaiveDate, &str), StoreError> {
    let rest = key
        .strip_prefix(QUEUE_PREFIX)
        .ok_or_else(|| StoreError::CorruptKey(key.to_string()))?;
    let (date, id) = rest
        .split_once('/')
        .ok_or_else(|| StoreError::CorruptKey(key.to_string()))?;
    let date = NaiveDate::parse_from_str(date, DATE_FMT)
        .map_err(|_| StoreError::CorruptKey(key.to_string()))?;
    Ok((date, id))
}

/// Extract the article id from a sketch-row key. Ids may contain `/`, so
/// only the three fixed-width segments before the id are split off.
pub(crate) fn parse_sketch_key_id(key: &str) -> Result<&str, StoreError> {
    let rest = key
        .strip_prefix("sketch/")
        .ok_or_else(|| StoreError::CorruptKey(key.to_string()))?;
    let mut segments = rest.splitn(4, '/');
    let (_fp, _hash, _date) = match (segments.next(), segments.next(), segments.next()) {
        (Some(fp), Some(hash), Some(date)) => (fp, hash, date),
        _ => return Err(StoreError::CorruptKey(key.to_string())),
    };
    segments
        .next()
        .ok_or_else(|| StoreError::CorruptKey(key.to_string()))
}
