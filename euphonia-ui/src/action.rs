// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User action events.
//!
//! An [`ActionEvent`] is one user interaction: its kind, and the integer, float, boolean or text
//! parameter the kind carries. The kind set is closed; events are XML-encoded for the control
//! protocol and binary-encoded for the persistence block.

use euphonia_core::errors::{decode_error, Result};

/// The closed set of user action kinds. The discriminants are the wire `actionType` codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionKind {
    /// Restore the scene and decoder preferences to their defaults.
    Reset = 0,
    /// Select a transmitted DRC set.
    DrcSelected = 1,
    /// DRC boost factor.
    Boost = 2,
    /// DRC compression (attenuation) factor.
    Compress = 3,
    /// Target loudness preference.
    TargetLoudness = 4,
    /// Album mode on or off.
    AlbumMode = 5,
    /// Select a group preset.
    PresetSelected = 6,
    /// Accessibility rendering preference.
    AccessibilityPreference = 7,
    /// Mute or unmute a group.
    GroupMute = 10,
    /// Group gain offset.
    GroupBalance = 11,
    /// Group azimuth offset.
    GroupAzimuth = 12,
    /// Group elevation offset.
    GroupElevation = 13,
    /// Mute or unmute a switch group.
    SwitchGroupMute = 20,
    /// Switch group gain offset.
    SwitchGroupBalance = 21,
    /// Switch group azimuth offset.
    SwitchGroupAzimuth = 22,
    /// Switch group elevation offset.
    SwitchGroupElevation = 23,
    /// Select the active member of a switch group by language.
    LanguageSelected = 30,
    /// Bind the session to a scene UUID.
    SetGuid = 31,
}

impl ActionKind {
    /// The wire `actionType` code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a wire `actionType` code.
    pub fn from_code(code: u8) -> Result<ActionKind> {
        let kind = match code {
            0 => ActionKind::Reset,
            1 => ActionKind::DrcSelected,
            2 => ActionKind::Boost,
            3 => ActionKind::Compress,
            4 => ActionKind::TargetLoudness,
            5 => ActionKind::AlbumMode,
            6 => ActionKind::PresetSelected,
            7 => ActionKind::AccessibilityPreference,
            10 => ActionKind::GroupMute,
            11 => ActionKind::GroupBalance,
            12 => ActionKind::GroupAzimuth,
            13 => ActionKind::GroupElevation,
            20 => ActionKind::SwitchGroupMute,
            21 => ActionKind::SwitchGroupBalance,
            22 => ActionKind::SwitchGroupAzimuth,
            23 => ActionKind::SwitchGroupElevation,
            30 => ActionKind::LanguageSelected,
            31 => ActionKind::SetGuid,
            _ => return decode_error("ui (action): unknown action type code"),
        };
        Ok(kind)
    }

    /// True for kinds targeting a group or switch group. These carry the target id in
    /// `param_int`.
    pub fn is_targeted(&self) -> bool {
        matches!(
            self,
            ActionKind::GroupMute
                | ActionKind::GroupBalance
                | ActionKind::GroupAzimuth
                | ActionKind::GroupElevation
                | ActionKind::SwitchGroupMute
                | ActionKind::SwitchGroupBalance
                | ActionKind::SwitchGroupAzimuth
                | ActionKind::SwitchGroupElevation
        )
    }
}

/// One user interaction event.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionEvent {
    pub kind: ActionKind,
    /// Integer parameter. For targeted kinds this is the group or switch group id.
    pub param_int: Option<i32>,
    pub param_float: Option<f32>,
    pub param_bool: Option<bool>,
    pub param_text: Option<String>,
}

impl ActionEvent {
    pub fn new(kind: ActionKind) -> ActionEvent {
        ActionEvent { kind, param_int: None, param_float: None, param_bool: None, param_text: None }
    }

    pub fn with_int(mut self, value: i32) -> ActionEvent {
        self.param_int = Some(value);
        self
    }

    pub fn with_float(mut self, value: f32) -> ActionEvent {
        self.param_float = Some(value);
        self
    }

    pub fn with_bool(mut self, value: bool) -> ActionEvent {
        self.param_bool = Some(value);
        self
    }

    pub fn with_text<S: Into<String>>(mut self, value: S) -> ActionEvent {
        self.param_text = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionEvent, ActionKind};

    #[test]
    fn verify_code_round_trip() {
        let kinds = [
            ActionKind::Reset,
            ActionKind::DrcSelected,
            ActionKind::AlbumMode,
            ActionKind::PresetSelected,
            ActionKind::GroupMute,
            ActionKind::GroupElevation,
            ActionKind::SwitchGroupAzimuth,
            ActionKind::LanguageSelected,
            ActionKind::SetGuid,
        ];

        for kind in kinds {
            assert_eq!(ActionKind::from_code(kind.code()).unwrap(), kind);
        }

        assert!(ActionKind::from_code(99).is_err());
        assert!(ActionKind::from_code(8).is_err());
    }

    #[test]
    fn verify_builder() {
        let event = ActionEvent::new(ActionKind::GroupBalance).with_int(3).with_float(-1.5);

        assert!(event.kind.is_targeted());
        assert_eq!(event.param_int, Some(3));
        assert_eq!(event.param_float, Some(-1.5));
        assert_eq!(event.param_bool, None);
        assert_eq!(event.param_text, None);
    }
}
