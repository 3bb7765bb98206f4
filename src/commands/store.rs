use crate::commands::db::{get_item, set_item, write_transaction};
use crate::error::{BugError, BugResult};
use crate::models::bug::BugRecord;
use rusqlite::Connection;

pub const BUGS_KEY: &str = "tester-bugs";

/// Stored collection in insertion order. A value that fails to decode reads as empty.
pub fn load_all(conn: &Connection) -> BugResult<Vec<BugRecord>> {
    let Some(raw) = get_item(conn, BUGS_KEY)? else {
        return Ok(Vec::new());
    };

    match decode_records(&raw) {
        Ok(records) => Ok(records),
        Err(err) => {
            log::warn!("Ignoring unreadable bug collection: {err}");
            Ok(Vec::new())
        }
    }
}

pub fn save_all(conn: &Connection, records: &[BugRecord]) -> BugResult<()> {
    let raw = serde_json::to_string(records)
        .map_err(|e| BugError::Serialize(format!("Failed to serialize bugs: {e}")))?;
    set_item(conn, BUGS_KEY, &raw)?;
    Ok(())
}

/// Each mutation below reads, edits and writes the collection inside one write
/// transaction, so overlapping commands on other connections queue up instead
/// of overwriting each other.
pub fn append(conn: &Connection, record: BugRecord) -> BugResult<Vec<BugRecord>> {
    let tx = write_transaction(conn)?;
    let mut records = load_all(&tx)?;
    if records.iter().any(|existing| existing.id == record.id) {
        return Err(BugError::DuplicateId(record.id));
    }

    records.push(record);
    save_all(&tx, &records)?;
    tx.commit()?;
    Ok(records)
}

/// Substitutes the record with a matching id in place. The stored id and
/// creation time are kept. Unknown ids leave the collection untouched.
pub fn replace(conn: &Connection, id: &str, new_record: BugRecord) -> BugResult<Vec<BugRecord>> {
    let tx = write_transaction(conn)?;
    let mut records = load_all(&tx)?;
    let Some(slot) = records.iter_mut().find(|record| record.id == id) else {
        log::debug!("replace: no bug with id {id}");
        return Ok(records);
    };

    *slot = BugRecord {
        id: slot.id.clone(),
        created_at: slot.created_at,
        ..new_record
    };

    save_all(&tx, &records)?;
    tx.commit()?;
    Ok(records)
}

pub fn remove(conn: &Connection, id: &str) -> BugResult<Vec<BugRecord>> {
    let tx = write_transaction(conn)?;
    let mut records = load_all(&tx)?;
    let before = records.len();
    records.retain(|record| record.id != id);

    if records.len() != before {
        save_all(&tx, &records)?;
        tx.commit()?;
    }
    Ok(records)
}

fn decode_records(raw: &str) -> BugResult<Vec<BugRecord>> {
    serde_json::from_str::<Vec<BugRecord>>(raw)
        .map_err(|e| BugError::StorageCorrupt(format!("{BUGS_KEY}: {e}")))
}
