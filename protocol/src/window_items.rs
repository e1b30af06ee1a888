//! Inventory window snapshots. The slot array has no field-list layout:
//! an empty slot is a bare `-1` item id with no count or uses following it,
//! so the sequence carries its own codec.

use crate::packets::WindowItems;
use crate::{CodecError, Deserializable, Result, Serializable};
use std::io::{Read, Write};

/// One inventory slot. An id of `-1` marks the slot empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub item_id: i16,
    pub count: i8,
    pub uses: i16,
}

impl Slot {
    pub const EMPTY: Slot = Slot {
        item_id: -1,
        count: 0,
        uses: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.item_id == -1
    }
}

impl Serializable for WindowItems {
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
        if self.slots.len() > i16::MAX as usize {
            return Err(CodecError::OutOfRange("too many slots in window"));
        }
        let mut sum = 0;
        sum += self.window.to_writer(output)?;
        sum += (self.slots.len() as i16).to_writer(output)?;
        for slot in &self.slots {
            sum += slot.item_id.to_writer(output)?;
            if !slot.is_empty() {
                sum += slot.count.to_writer(output)?;
                sum += slot.uses.to_writer(output)?;
            }
        }
        Ok(sum)
    }
}

impl Deserializable for WindowItems {
    fn from_reader<R: Read>(input: &mut R) -> Result<Self> {
        let window = i32::from_reader(input)?;
        let count = i16::from_reader(input)?;
        if count < 0 {
            return Err(CodecError::NegativeLength);
        }
        let mut slots = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let item_id = i16::from_reader(input)?;
            if item_id == -1 {
                slots.push(Slot::EMPTY);
            } else {
                slots.push(Slot {
                    item_id,
                    count: i8::from_reader(input)?,
                    uses: i16::from_reader(input)?,
                });
            }
        }
        Ok(WindowItems { window, slots })
    }
}
