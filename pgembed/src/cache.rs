//! Statement cache of the auto prepare mode.
//!
//! The cache maps query text to generated statement names. It is a fixed
//! array of 2039 buckets with 8 slots each, slot `0` is never used so that
//! `0` means "not found". When a bucket is full the least executed slot is
//! recycled and its statement deallocated.
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    Result,
    common::debug_log,
    connection, memory,
    statement,
    value::Compat,
};

const BUCKETS: usize = 2039;
const PER_BUCKET: usize = 8;
const ARRAY_SIZE: usize = BUCKETS * PER_BUCKET + 1;

/// Only the head of a query is hashed.
const HASH_LEN: usize = 50;

const STMTID_SIZE: usize = 32;

type AtomicId = AtomicU32;

static NEXT_ID: AtomicId = AtomicId::new(1);

/// Generated statement name, `ecpg<N>`.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementId {
    buf: [u8; STMTID_SIZE],
    len: u8,
}

impl StatementId {
    pub(crate) fn next() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let mut buf = [0; STMTID_SIZE];
        buf[..4].copy_from_slice(b"ecpg");

        let mut b = itoa::Buffer::new();
        let digits = b.format(id).as_bytes();
        buf[4..4 + digits.len()].copy_from_slice(digits);

        Self { buf, len: (4 + digits.len()) as u8 }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or_default()
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("StatementId").field(&self.as_str()).finish()
    }
}

impl AsRef<str> for StatementId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[derive(Clone, Default)]
struct Entry {
    line: i32,
    /// `None` for an unused slot.
    id: Option<StatementId>,
    query: String,
    execs: u64,
    /// Connection name as given by the caller.
    connection: Option<String>,
}

/// Snapshot of a cache slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub slot: usize,
    pub line: i32,
    pub name: String,
    pub query: String,
    pub execs: u64,
    pub connection: Option<String>,
}

static CACHE: Mutex<Option<Vec<Entry>>> = Mutex::new(None);

/// First slot of the bucket of `query`.
///
/// Each byte is added to the hash which is then rotated left by 13 bits,
/// the rotation wraps at 32 bits.
fn hash(query: &str) -> usize {
    let mut value: u64 = 0;
    for &byte in query.as_bytes().iter().take(HASH_LEN) {
        value += byte as u64;
        value <<= 13;
        let rot = (value & 0x1fff_0000_0000) >> 32;
        value = (value & 0xffff_ffff) | rot;
    }
    (value % BUCKETS as u64) as usize * PER_BUCKET + 1
}

fn search(entries: &[Entry], query: &str) -> usize {
    let start = hash(query);
    (start..start + PER_BUCKET)
        .find(|&i| entries[i].id.is_some() && entries[i].query == query)
        .unwrap_or(0)
}

/// Empty slot `ent`, deallocating its statement.
fn free_entry(entries: &mut [Entry], line: i32, compat: Compat, ent: usize) -> Result<()> {
    let entry = &mut entries[ent];
    let Some(id) = &entry.id else {
        return Ok(());
    };

    if let Some(conn) = connection::get_connection(entry.connection.as_deref()) {
        let mut inner = conn.lock();
        if let Some(idx) = inner.find_prepared(id.as_str()) {
            statement::deallocate_one(line, compat, &mut inner, idx)?;
        }
    }

    *entry = Entry::default();
    Ok(())
}

fn add(
    entries: &mut [Entry],
    line: i32,
    id: StatementId,
    connection: Option<&str>,
    compat: Compat,
    query: &str,
) -> Result<usize> {
    let start = hash(query);

    let ent = match (start..start + PER_BUCKET).find(|&i| entries[i].id.is_none()) {
        Some(free) => free,
        None => (start..start + PER_BUCKET)
            .reduce(|lu, i| if entries[i].execs < entries[lu].execs { i } else { lu })
            .unwrap_or(start),
    };

    free_entry(entries, line, compat, ent)?;

    entries[ent] = Entry {
        line,
        id: Some(id),
        query: query.to_owned(),
        execs: 0,
        connection: connection.map(str::to_owned),
    };

    Ok(ent)
}

/// Name of the prepared statement for `query`, preparing it when needed.
///
/// A cached statement is prepared again on a connection that does not know
/// it yet, under the same name.
pub(crate) fn auto_prepare(line: i32, conn: Option<&str>, compat: Compat, query: &str) -> Result<String> {
    let mut guard = CACHE.lock();
    let entries = match &mut *guard {
        Some(entries) => entries,
        empty => {
            let mut entries = Vec::new();
            memory::alloc_vec(&mut entries, ARRAY_SIZE, line)?;
            empty.insert(entries)
        }
    };

    let ent = search(entries, query);

    let ent = if ent != 0 {
        debug_log!("ecpg_auto_prepare on line {line}: statement found in cache; entry {ent}");

        let name = entries[ent].id.as_ref().map(|id| id.as_str().to_owned()).unwrap_or_default();
        let conn = connection::get_connection(conn).ok_or_else(|| connection::no_conn(line, conn))?;
        let mut inner = conn.lock();
        if inner.find_prepared(&name).is_none() {
            statement::prepare_common(line, &mut inner, &name, query)?;
        }
        ent
    } else {
        debug_log!("ecpg_auto_prepare on line {line}: statement not in cache; inserting");

        let id = StatementId::next();
        statement::prepare(line, conn, id.as_str(), query)?;
        add(entries, line, id, conn, compat, query)?
    };

    let entry = &mut entries[ent];
    entry.execs += 1;
    Ok(entry.id.as_ref().map(|id| id.as_str().to_owned()).unwrap_or_default())
}

/// Look up the cache slot holding `query`.
pub fn lookup(query: &str) -> Option<CacheEntry> {
    let guard = CACHE.lock();
    let entries = guard.as_ref()?;
    match search(entries, query) {
        0 => None,
        slot => {
            let e = &entries[slot];
            Some(CacheEntry {
                slot,
                line: e.line,
                name: e.id.as_ref()?.as_str().to_owned(),
                query: e.query.clone(),
                execs: e.execs,
                connection: e.connection.clone(),
            })
        }
    }
}
