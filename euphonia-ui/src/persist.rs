// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence of user actions across sessions.
//!
//! Recent user actions are kept per scene UUID and serialized into a caller-owned memory block so
//! a scene re-entered later starts with the listener's previous choices. The block format is
//! private: a version tag, per-UUID records and a trailing CRC-16. The block contract is public:
//! 16-bit aligned, at least [`MIN_BLOCK_LEN`] bytes, and a block without valid data is reported
//! gracefully, distinct from a hard size or alignment error.
//!
//! When the serialized state outgrows the byte budget, whole UUID record sets are evicted oldest
//! first.

use std::collections::VecDeque;

use log::debug;

use euphonia_core::checksum::Crc16Ansi;
use euphonia_core::errors::{buffer_error, Result};

use crate::action::{ActionEvent, ActionKind};

/// The smallest valid persistence block, in bytes.
pub const MIN_BLOCK_LEN: usize = 512;

const FORMAT_VERSION: u16 = 1;

/// Layout of the per-action presence flags.
const FLAG_INT: u8 = 0x1;
const FLAG_FLOAT: u8 = 0x2;
const FLAG_BOOL: u8 = 0x4;
const FLAG_TEXT: u8 = 0x8;

/// The remembered actions of one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct UserState {
    pub uuid: [u8; 16],
    pub actions: Vec<ActionEvent>,
}

/// A bounded, LRU-evicting store of per-scene user actions.
#[derive(Debug)]
pub struct Persistence {
    /// Scene states ordered least to most recently used.
    states: VecDeque<UserState>,
    /// The serialized byte budget, normally the length of the caller's block.
    capacity: usize,
}

fn check_block(block: &[u8]) -> Result<()> {
    if block.len() < MIN_BLOCK_LEN {
        return buffer_error("ui (persist): block smaller than the minimum");
    }
    if block.as_ptr().align_offset(2) != 0 {
        return buffer_error("ui (persist): block is not 16-bit aligned");
    }
    Ok(())
}

impl Persistence {
    /// Instantiate an empty store with a serialized byte budget of `capacity`.
    pub fn new(capacity: usize) -> Persistence {
        Persistence { states: VecDeque::new(), capacity }
    }

    /// Deserialize a store from a caller-owned block.
    ///
    /// An undersized or misaligned block is a hard error. A block holding no valid data (never
    /// written, wrong version, failed integrity check) yields `Ok(None)`.
    pub fn load(block: &[u8]) -> Result<Option<Persistence>> {
        check_block(block)?;

        let mut store = Persistence::new(block.len());
        match store.parse(block) {
            Some(()) => Ok(Some(store)),
            None => Ok(None),
        }
    }

    /// Serialize the store into a caller-owned block. Returns the number of bytes written.
    pub fn store(&self, block: &mut [u8]) -> Result<usize> {
        check_block(block)?;

        let bytes = self.encode();
        if bytes.len() > block.len() {
            return buffer_error("ui (persist): block too small for the serialized state");
        }

        block[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Record a user action for the scene `uuid`, marking the scene most recently used.
    ///
    /// An action of the same kind (and, for group-targeted kinds, the same target) replaces the
    /// earlier one. Whole scenes are evicted oldest first when the byte budget is exceeded.
    pub fn remember(&mut self, uuid: [u8; 16], event: ActionEvent) {
        // Move the scene to the most-recently-used end.
        match self.states.iter().position(|s| s.uuid == uuid) {
            Some(pos) => {
                if let Some(state) = self.states.remove(pos) {
                    self.states.push_back(state);
                }
            }
            None => self.states.push_back(UserState { uuid, actions: Vec::new() }),
        }

        let state = match self.states.back_mut() {
            Some(state) => state,
            None => return,
        };

        let same_slot = |a: &ActionEvent| {
            a.kind == event.kind && (!event.kind.is_targeted() || a.param_int == event.param_int)
        };

        match state.actions.iter_mut().find(|a| same_slot(a)) {
            Some(slot) => *slot = event,
            None => state.actions.push(event),
        }

        while self.encoded_len() > self.capacity && self.states.len() > 1 {
            if let Some(evicted) = self.states.pop_front() {
                debug!("persistence budget exceeded, evicting scene {:02x?}", &evicted.uuid[..4]);
            }
        }
    }

    /// The remembered actions for a scene, oldest first.
    pub fn actions_for(&self, uuid: &[u8; 16]) -> Option<&[ActionEvent]> {
        self.states.iter().find(|s| &s.uuid == uuid).map(|s| s.actions.as_slice())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn encoded_len(&self) -> usize {
        // Version + count + records + crc.
        let mut len = 2 + 2 + 2;
        for state in &self.states {
            len += 16 + 2;
            for action in &state.actions {
                len += 2;
                len += action.param_int.map_or(0, |_| 4);
                len += action.param_float.map_or(0, |_| 4);
                len += action.param_bool.map_or(0, |_| 1);
                len += action.param_text.as_ref().map_or(0, |t| 1 + t.len().min(255));
            }
        }
        len
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());

        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.states.len() as u16).to_le_bytes());

        for state in &self.states {
            out.extend_from_slice(&state.uuid);
            out.extend_from_slice(&(state.actions.len() as u16).to_le_bytes());

            for action in &state.actions {
                let mut flags = 0u8;
                if action.param_int.is_some() {
                    flags |= FLAG_INT;
                }
                if action.param_float.is_some() {
                    flags |= FLAG_FLOAT;
                }
                if action.param_bool.is_some() {
                    flags |= FLAG_BOOL;
                }
                if action.param_text.is_some() {
                    flags |= FLAG_TEXT;
                }

                out.push(action.kind.code());
                out.push(flags);

                if let Some(value) = action.param_int {
                    out.extend_from_slice(&value.to_le_bytes());
                }
                if let Some(value) = action.param_float {
                    out.extend_from_slice(&value.to_bits().to_le_bytes());
                }
                if let Some(value) = action.param_bool {
                    out.push(u8::from(value));
                }
                if let Some(ref text) = action.param_text {
                    let bytes = text.as_bytes();
                    let len = bytes.len().min(255);
                    out.push(len as u8);
                    out.extend_from_slice(&bytes[..len]);
                }
            }
        }

        let mut crc = Crc16Ansi::new(0);
        crc.process_buf_bytes(&out);
        out.extend_from_slice(&crc.crc().to_le_bytes());

        out
    }

    /// Parse a serialized block into `self`. `None` means the block holds no valid data.
    fn parse(&mut self, block: &[u8]) -> Option<()> {
        let mut reader = Reader { buf: block, pos: 0 };

        if reader.read_u16()? != FORMAT_VERSION {
            return None;
        }

        let num_states = reader.read_u16()?;
        let mut states = VecDeque::with_capacity(usize::from(num_states));

        for _ in 0..num_states {
            let uuid: [u8; 16] = reader.read_bytes(16)?.try_into().ok()?;
            let num_actions = reader.read_u16()?;

            let mut actions = Vec::with_capacity(usize::from(num_actions));
            for _ in 0..num_actions {
                let kind = ActionKind::from_code(reader.read_u8()?).ok()?;
                let flags = reader.read_u8()?;

                let mut action = ActionEvent::new(kind);
                if flags & FLAG_INT != 0 {
                    action.param_int = Some(i32::from_le_bytes(
                        reader.read_bytes(4)?.try_into().ok()?,
                    ));
                }
                if flags & FLAG_FLOAT != 0 {
                    action.param_float = Some(f32::from_bits(u32::from_le_bytes(
                        reader.read_bytes(4)?.try_into().ok()?,
                    )));
                }
                if flags & FLAG_BOOL != 0 {
                    action.param_bool = Some(reader.read_u8()? != 0);
                }
                if flags & FLAG_TEXT != 0 {
                    let len = usize::from(reader.read_u8()?);
                    let text = std::str::from_utf8(reader.read_bytes(len)?).ok()?;
                    action.param_text = Some(text.to_string());
                }

                actions.push(action);
            }

            states.push_back(UserState { uuid, actions });
        }

        let payload_end = reader.pos;
        let stored_crc = reader.read_u16()?;

        let mut crc = Crc16Ansi::new(0);
        crc.process_buf_bytes(&block[..payload_end]);
        if crc.crc() != stored_crc {
            debug!("persistence block failed the integrity check");
            return None;
        }

        self.states = states;
        Some(())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.buf.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::{Persistence, MIN_BLOCK_LEN};
    use crate::action::{ActionEvent, ActionKind};

    /// A test block with guaranteed 16-bit alignment.
    #[repr(align(2))]
    struct Block([u8; 600]);

    fn mute_action(group: i32) -> ActionEvent {
        ActionEvent::new(ActionKind::GroupMute).with_int(group).with_bool(true)
    }

    #[test]
    fn verify_round_trip() {
        let mut store = Persistence::new(MIN_BLOCK_LEN);
        store.remember([1; 16], mute_action(3));
        store.remember([1; 16], ActionEvent::new(ActionKind::PresetSelected).with_int(2));
        store.remember([2; 16], ActionEvent::new(ActionKind::LanguageSelected).with_text("deu"));

        let mut block = Block([0; 600]);
        store.store(&mut block.0).unwrap();

        let restored = Persistence::load(&block.0).unwrap().expect("valid data");
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.actions_for(&[1; 16]).unwrap().len(), 2);

        let actions = restored.actions_for(&[2; 16]).unwrap();
        assert_eq!(actions[0].param_text.as_deref(), Some("deu"));
    }

    #[test]
    fn verify_blank_block_is_no_valid_data() {
        let block = Block([0; 600]);
        assert!(Persistence::load(&block.0).unwrap().is_none());
    }

    #[test]
    fn verify_corruption_detected() {
        let mut store = Persistence::new(MIN_BLOCK_LEN);
        store.remember([7; 16], mute_action(1));

        let mut block = Block([0; 600]);
        let written = store.store(&mut block.0).unwrap();

        // Flip one payload byte: the CRC must catch it.
        block.0[written / 2] ^= 0x40;
        assert!(Persistence::load(&block.0).unwrap().is_none());
    }

    #[test]
    fn verify_block_contract_is_hard_error() {
        let block = Block([0; 600]);

        // Undersized.
        assert!(Persistence::load(&block.0[..256]).is_err());

        // Misaligned: offset by one byte from an aligned backing store.
        assert!(Persistence::load(&block.0[1..513]).is_err());

        let mut store = Persistence::new(MIN_BLOCK_LEN);
        store.remember([1; 16], mute_action(1));
        let mut small = [0u8; 64];
        assert!(store.store(&mut small).is_err());
    }

    #[test]
    fn verify_same_action_slot_replaced() {
        let mut store = Persistence::new(MIN_BLOCK_LEN);
        store.remember([1; 16], mute_action(3));
        store.remember([1; 16], ActionEvent::new(ActionKind::GroupMute).with_int(3).with_bool(false));

        // Same kind, different target group: a separate slot.
        store.remember([1; 16], mute_action(4));

        let actions = store.actions_for(&[1; 16]).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].param_bool, Some(false));
    }

    #[test]
    fn verify_lru_eviction() {
        // A budget that fits two scene records but not three.
        let mut store = Persistence::new(64);

        store.remember([1; 16], mute_action(1));
        store.remember([2; 16], mute_action(1));

        // Touch scene 1 so scene 2 becomes the oldest.
        store.remember([1; 16], mute_action(2));

        store.remember([3; 16], mute_action(1));

        assert!(store.actions_for(&[2; 16]).is_none(), "oldest scene evicted");
        assert!(store.actions_for(&[1; 16]).is_some());
        assert!(store.actions_for(&[3; 16]).is_some());
    }
}
