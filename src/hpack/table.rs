//! Static and dynamic HPACK tables behind the joined address space
//! (RFC 7541 §2.3.3): index 0 is invalid, 1..=61 is the static table,
//! 62 onwards is the dynamic table, most recently inserted first.

use super::HpackError;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

/// https://httpwg.org/specs/rfc7541.html#static.table.definition
#[rustfmt::skip]
pub static STATIC_TABLE: [(&[u8], &[u8]); 61] = [
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

fn static_pair_index(name: &Bytes, value: &Bytes) -> Option<usize> {
    static BY_PAIR: OnceLock<HashMap<(Bytes, Bytes), usize>> = OnceLock::new();
    let map = BY_PAIR.get_or_init(|| {
        STATIC_TABLE
            .iter()
            .enumerate()
            .map(|(i, &(n, v))| ((Bytes::from_static(n), Bytes::from_static(v)), i + 1))
            .collect()
    });
    map.get(&(name.clone(), value.clone())).copied()
}

fn static_name_index(name: &Bytes) -> Option<usize> {
    static BY_NAME: OnceLock<HashMap<Bytes, usize>> = OnceLock::new();
    let map = BY_NAME.get_or_init(|| {
        let mut by_name = HashMap::new();
        for (i, &(n, _)) in STATIC_TABLE.iter().enumerate() {
            by_name.entry(Bytes::from_static(n)).or_insert(i + 1);
        }
        by_name
    });
    map.get(name).copied()
}

/// One dynamic-table entry. `Bytes` handles keep clones cheap for the
/// reverse maps.
#[derive(Debug, Clone)]
pub struct Entry {
    name: Bytes,
    value: Bytes,
    /// Monotonic insertion number; newest-first indices are derived from it
    /// so the reverse maps survive evictions without renumbering.
    seq: u64,
}

impl Entry {
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    #[must_use]
    pub fn hpack_size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

/// Insertion-ordered eviction table with a byte budget and reverse lookup
/// maps for the encoder side.
#[derive(Debug, Default)]
pub struct DynamicTable {
    entries: VecDeque<Entry>,
    occupancy: usize,
    capacity: usize,
    next_seq: u64,
    by_pair: HashMap<(Bytes, Bytes), u64>,
    by_name: HashMap<Bytes, u64>,
}

impl DynamicTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entry at 1-based dynamic index (1 = most recently inserted).
    pub fn at(&self, index: usize) -> Result<&Entry, HpackError> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(HpackError::InvalidIndex(index))
    }

    /// Inserts at index 1, evicting from the oldest end until the entry
    /// fits. An entry larger than the whole capacity empties the table and
    /// is itself discarded.
    pub fn insert(&mut self, name: Bytes, value: Bytes) {
        let entry = Entry {
            name,
            value,
            seq: self.next_seq,
        };
        let size = entry.hpack_size();

        if size > self.capacity {
            self.evict_to(0);
            return;
        }
        self.evict_to(self.capacity - size);

        self.next_seq += 1;
        self.by_pair
            .insert((entry.name.clone(), entry.value.clone()), entry.seq);
        self.by_name.insert(entry.name.clone(), entry.seq);
        self.occupancy += size;
        self.entries.push_front(entry);
    }

    /// Applies a new capacity, evicting as needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.evict_to(capacity);
        self.capacity = capacity;
    }

    /// 1-based dynamic index plus whether the value matched too.
    #[must_use]
    pub fn find(&self, name: &Bytes, value: &Bytes) -> Option<(usize, bool)> {
        if let Some(&seq) = self.by_pair.get(&(name.clone(), value.clone())) {
            return Some((self.index_of_seq(seq), true));
        }
        self.by_name
            .get(name)
            .map(|&seq| (self.index_of_seq(seq), false))
    }

    fn index_of_seq(&self, seq: u64) -> usize {
        // front().seq is the newest and addresses index 1
        (self.entries.front().expect("live seq implies entries").seq - seq) as usize + 1
    }

    fn evict_to(&mut self, budget: usize) {
        while self.occupancy > budget {
            let evicted = self.entries.pop_back().expect("occupancy implies entries");
            self.occupancy -= evicted.hpack_size();
            let key = (evicted.name.clone(), evicted.value.clone());
            if self.by_pair.get(&key) == Some(&evicted.seq) {
                self.by_pair.remove(&key);
            }
            if self.by_name.get(&evicted.name) == Some(&evicted.seq) {
                self.by_name.remove(&evicted.name);
            }
        }
    }
}

/// The joined static + dynamic address space used by both codecs.
#[derive(Debug)]
pub struct HpackTable {
    dynamic: DynamicTable,
}

impl HpackTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            dynamic: DynamicTable::new(capacity),
        }
    }

    /// Name/value behind a joined index; index 0 and out-of-range indices
    /// are compression errors.
    pub fn at(&self, index: usize) -> Result<(Bytes, Bytes), HpackError> {
        if index == 0 {
            return Err(HpackError::InvalidIndex(0));
        }
        if index <= STATIC_TABLE.len() {
            let (name, value) = STATIC_TABLE[index - 1];
            return Ok((Bytes::from_static(name), Bytes::from_static(value)));
        }
        let entry = self.dynamic.at(index - STATIC_TABLE.len())?;
        Ok((entry.name.clone(), entry.value.clone()))
    }

    /// Best joined index for the field: a full static match wins, then a
    /// full dynamic match, then any name-only match (static preferred).
    #[must_use]
    pub fn find(&self, name: &Bytes, value: &Bytes) -> Option<(usize, bool)> {
        if let Some(index) = static_pair_index(name, value) {
            return Some((index, true));
        }
        let dynamic = self
            .dynamic
            .find(name, value)
            .map(|(i, full)| (i + STATIC_TABLE.len(), full));
        if let Some((_, true)) = dynamic {
            return dynamic;
        }
        if let Some(index) = static_name_index(name) {
            return Some((index, false));
        }
        dynamic
    }

    pub fn insert(&mut self, name: Bytes, value: Bytes) {
        self.dynamic.insert(name, value);
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.dynamic.set_capacity(capacity);
    }

    #[must_use]
    pub fn dynamic(&self) -> &DynamicTable {
        &self.dynamic
    }
}
