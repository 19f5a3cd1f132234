//! Stateful HPACK encoder. Mirrors the state the peer's decoder will
//! build, so indexing decisions here must match what actually goes on the
//! wire.

use super::table::HpackTable;
use super::{integer, string, HeaderField, IndexPolicy};
use crate::buffer::ByteBuf;
use std::collections::VecDeque;

const DEFAULT_TABLE_SIZE: usize = 4096;

/// Huffman is used when `100 * encoded / raw` does not exceed this.
const DEFAULT_MIN_HUFFMAN_RATE: u32 = 90;

const INDEXED: u8 = 0x80;
const INCREMENTAL: u8 = 0x40;
const TABLE_SIZE_UPDATE: u8 = 0x20;
const NEVER_INDEXED: u8 = 0x10;
const WITHOUT_INDEX: u8 = 0x00;

pub struct Encoder {
    table: HpackTable,
    min_huffman_rate: u32,
    /// Capacity change to announce at the start of the next header block.
    pending_resize: Option<usize>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TABLE_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: HpackTable::new(capacity),
            min_huffman_rate: DEFAULT_MIN_HUFFMAN_RATE,
            pending_resize: None,
        }
    }

    /// Adjusts the Huffman selection threshold (percent; 0 disables
    /// compression for all but short strings).
    pub fn set_min_huffman_rate(&mut self, rate: u32) {
        self.min_huffman_rate = rate;
    }

    /// Schedules a dynamic-table capacity change, announced via a size
    /// update at the start of the next encoded block. Called when the peer
    /// lowers HEADER_TABLE_SIZE.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.pending_resize = Some(capacity);
    }

    #[must_use]
    pub fn table(&self) -> &HpackTable {
        &self.table
    }

    /// Encodes fields from the front of `fields` until the byte budget or
    /// the list is exhausted. Fully encoded fields are popped; a field
    /// never straddles the budget. Returns the encoded block fragment and
    /// the number of fields consumed.
    pub fn encode(&mut self, fields: &mut VecDeque<HeaderField>, budget: usize) -> (ByteBuf, usize) {
        let mut out: Vec<u8> = Vec::with_capacity(budget.min(4096));
        let mut encoded_fields = 0;

        if let Some(capacity) = self.pending_resize.take() {
            out.extend_from_slice(integer::encode(TABLE_SIZE_UPDATE, 5, capacity as u32).as_slice());
            self.table.set_capacity(capacity);
        }

        while let Some(field) = fields.front() {
            let found = self.table.find(&field.name_bytes(), &field.value_bytes());
            let remaining = budget.saturating_sub(out.len());

            // a full match is only usable when indexing is allowed at all
            if field.policy() == IndexPolicy::Default {
                if let Some((index, true)) = found {
                    let encoded = integer::encode(INDEXED, 7, index as u32);
                    if encoded.len() > remaining {
                        break;
                    }
                    out.extend_from_slice(encoded.as_slice());
                    fields.pop_front();
                    encoded_fields += 1;
                    continue;
                }
            }
            let name_index = found.map(|(index, _)| index);

            let (opcode, prefix_bits) = match field.policy() {
                IndexPolicy::Default => (INCREMENTAL, 6),
                IndexPolicy::WithoutIndex => (WITHOUT_INDEX, 4),
                IndexPolicy::NeverIndex => (NEVER_INDEXED, 4),
            };

            let name_prefix = integer::encode(opcode, prefix_bits, name_index.unwrap_or(0) as u32);
            let (value_len, value_huffman) = string::estimate(field.value(), self.min_huffman_rate);
            let mut field_size = name_prefix.len() + string::encoded_size(value_len);

            let name_estimate = if name_index.is_none() {
                let estimate = string::estimate(field.name(), self.min_huffman_rate);
                field_size += string::encoded_size(estimate.0);
                Some(estimate)
            } else {
                None
            };

            if field_size > remaining {
                break;
            }

            out.extend_from_slice(name_prefix.as_slice());
            if let Some((name_len, name_huffman)) = name_estimate {
                string::encode_into(field.name(), name_len, name_huffman, &mut out);
            }
            string::encode_into(field.value(), value_len, value_huffman, &mut out);

            if field.policy() == IndexPolicy::Default {
                self.table.insert(field.name_bytes(), field.value_bytes());
            }

            fields.pop_front();
            encoded_fields += 1;
        }

        (ByteBuf::from_slice(&out), encoded_fields)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
