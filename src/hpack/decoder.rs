//! Stateful HPACK decoder (RFC 7541 §3.2): consumes one complete header
//! block and yields the header list in order.

use super::table::HpackTable;
use super::{integer, string, HeaderField, HpackError, IndexPolicy};
use bytes::Bytes;

const DEFAULT_TABLE_SIZE: usize = 4096;

// First-byte patterns of the five field representations.
const INDEXED: u8 = 0x80;
const INCREMENTAL: u8 = 0x40;
const INCREMENTAL_MASK: u8 = 0xc0;
const TABLE_SIZE_UPDATE: u8 = 0x20;
const TABLE_SIZE_UPDATE_MASK: u8 = 0xe0;
const NEVER_INDEXED: u8 = 0x10;
const NEVER_INDEXED_MASK: u8 = 0xf0;

pub struct Decoder {
    table: HpackTable,
    /// Ceiling for size updates: the HEADER_TABLE_SIZE we advertised.
    max_capacity: usize,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TABLE_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: HpackTable::new(capacity),
            max_capacity: capacity,
        }
    }

    /// Raises or lowers the ceiling the peer's size updates may reach,
    /// mirroring a change of our advertised HEADER_TABLE_SIZE.
    pub fn set_max_capacity(&mut self, capacity: usize) {
        self.max_capacity = capacity;
        if self.table.dynamic().capacity() > capacity {
            self.table.set_capacity(capacity);
        }
    }

    #[must_use]
    pub fn table(&self) -> &HpackTable {
        &self.table
    }

    /// Decodes one complete header block (a HEADERS payload concatenated
    /// with all its CONTINUATION payloads).
    pub fn decode(&mut self, mut src: &[u8]) -> Result<Vec<HeaderField>, HpackError> {
        let mut fields = Vec::new();

        while let Some(&first) = src.first() {
            if first & INDEXED != 0 {
                src = self.indexed(src, &mut fields)?;
            } else if first & INCREMENTAL_MASK == INCREMENTAL {
                src = self.literal(src, &mut fields, 6, IndexPolicy::Default)?;
            } else if first & TABLE_SIZE_UPDATE_MASK == TABLE_SIZE_UPDATE {
                // only legal before the first field of a block
                if !fields.is_empty() {
                    return Err(HpackError::LateTableSizeUpdate);
                }
                src = self.table_size_update(src)?;
            } else if first & NEVER_INDEXED_MASK == NEVER_INDEXED {
                src = self.literal(src, &mut fields, 4, IndexPolicy::NeverIndex)?;
            } else {
                src = self.literal(src, &mut fields, 4, IndexPolicy::WithoutIndex)?;
            }
        }

        Ok(fields)
    }

    fn indexed<'a>(
        &mut self,
        src: &'a [u8],
        fields: &mut Vec<HeaderField>,
    ) -> Result<&'a [u8], HpackError> {
        let index = integer::decode(7, src)?;
        let (name, value) = self.table.at(index.value as usize)?;
        fields.push(HeaderField::new(name, value));
        Ok(&src[index.used..])
    }

    fn table_size_update<'a>(&mut self, src: &'a [u8]) -> Result<&'a [u8], HpackError> {
        let size = integer::decode(5, src)?;
        if size.value as usize > self.max_capacity {
            return Err(HpackError::TableSizeExceeded);
        }
        self.table.set_capacity(size.value as usize);
        Ok(&src[size.used..])
    }

    fn literal<'a>(
        &mut self,
        src: &'a [u8],
        fields: &mut Vec<HeaderField>,
        prefix_bits: u8,
        policy: IndexPolicy,
    ) -> Result<&'a [u8], HpackError> {
        let name_index = integer::decode(prefix_bits, src)?;
        let mut src = &src[name_index.used..];

        let name: Bytes = if name_index.value == 0 {
            let decoded = string::decode(src)?;
            src = &src[decoded.used..];
            decoded.value.into()
        } else {
            let (name, _) = self.table.at(name_index.value as usize)?;
            name
        };

        let decoded = string::decode(src)?;
        src = &src[decoded.used..];
        let value: Bytes = decoded.value.into();

        if policy == IndexPolicy::Default {
            self.table.insert(name.clone(), value.clone());
        }

        fields.push(match policy {
            IndexPolicy::Default => HeaderField::new(name, value),
            IndexPolicy::WithoutIndex => HeaderField::without_index(name, value),
            IndexPolicy::NeverIndex => HeaderField::never_indexed(name, value),
        });
        Ok(src)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
