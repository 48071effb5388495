// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use euphonia_core::errors::{decode_error, unsupported_param_error, Result};

use crate::action::{ActionEvent, ActionKind};
use crate::asi::AudioSceneInfo;
use crate::persist::{Persistence, MIN_BLOCK_LEN};
use crate::xml::{UiRequest, UiResponse, UiStateWriter};

/// Decoder-level listener preferences carried by the UI protocol but applied outside the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecoderPrefs {
    pub drc_selected: Option<i32>,
    pub boost: Option<f32>,
    pub compress: Option<f32>,
    pub target_loudness: Option<f32>,
    pub album_mode: Option<bool>,
    pub accessibility: Option<i32>,
    pub language: Option<String>,
}

/// The user interactivity manager.
///
/// Owns the current scene state and the listener's decoder preferences, applies incoming
/// [`ActionEvent`]s gated by the scene's capabilities, remembers them per scene UUID, and
/// serializes the state as a restartable XML document.
pub struct UiManager {
    scene: Option<AudioSceneInfo>,
    prefs: DecoderPrefs,
    history: Persistence,
    writer: Option<UiStateWriter>,
    /// Total successful state mutations.
    changes: u64,
    /// The mutation count the current document was rendered at.
    serialized: u64,
}

impl Default for UiManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UiManager {
    pub fn new() -> UiManager {
        UiManager {
            scene: None,
            prefs: DecoderPrefs::default(),
            history: Persistence::new(MIN_BLOCK_LEN),
            writer: None,
            changes: 0,
            serialized: 0,
        }
    }

    pub fn scene(&self) -> Option<&AudioSceneInfo> {
        self.scene.as_ref()
    }

    pub fn prefs(&self) -> &DecoderPrefs {
        &self.prefs
    }

    /// Install a new scene, replaying any actions remembered for its UUID.
    pub fn set_scene(&mut self, scene: AudioSceneInfo) {
        let uuid = scene.uuid;
        self.scene = Some(scene);
        self.writer = None;
        self.changes += 1;

        let remembered: Vec<ActionEvent> =
            self.history.actions_for(&uuid).map(<[_]>::to_vec).unwrap_or_default();

        for event in remembered {
            // A remembered action may no longer apply to the new rendition of the scene. That is
            // a quality degradation, not an error.
            if let Err(err) = self.dispatch(&event) {
                debug!("remembered action {:?} no longer applies: {}", event.kind, err);
            }
        }
    }

    /// Apply one user action and remember it for the current scene.
    pub fn apply_action(&mut self, event: &ActionEvent) -> Result<()> {
        self.dispatch(event)?;

        // Reset is a return to defaults, not a preference worth remembering.
        if event.kind != ActionKind::Reset {
            if let Some(ref scene) = self.scene {
                self.history.remember(scene.uuid, event.clone());
            }
        }

        Ok(())
    }

    /// Restore remembered actions from a caller-owned persistence block.
    ///
    /// Returns `true` if the block held valid data. Size and alignment violations are hard
    /// errors.
    pub fn restore_persistence(&mut self, block: &[u8]) -> Result<bool> {
        match Persistence::load(block)? {
            Some(history) => {
                self.history = history;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Serialize remembered actions into a caller-owned persistence block.
    pub fn save_persistence(&self, block: &mut [u8]) -> Result<usize> {
        self.history.store(block)
    }

    /// Write the XML scene state into `out`.
    ///
    /// Without [`UiRequest::FORCE_UPDATE`], an unchanged state yields
    /// [`UiResponse::NO_CHANGE`] and no output. A document that does not fit is continued by the
    /// next call; [`UiRequest::FORCE_RESTART_XML`] abandons a pending continuation.
    pub fn xml_state(&mut self, out: &mut [u8], request: UiRequest) -> (UiResponse, usize) {
        if request.contains(UiRequest::FORCE_RESTART_XML) {
            self.writer = None;
        }

        // A pending continuation takes precedence over change detection.
        if let Some(ref mut writer) = self.writer {
            if !writer.is_finished() {
                return writer.write_into(out);
            }
        }

        let scene = match self.scene {
            Some(ref scene) => scene,
            None => return (UiResponse::NO_CHANGE, 0),
        };

        let changed = self.changes != self.serialized;
        if !changed && !request.contains(UiRequest::FORCE_UPDATE) {
            return (UiResponse::NO_CHANGE, 0);
        }

        let mut actions = scene_actions(scene);
        actions.extend(prefs_actions(&self.prefs));

        let mut writer = UiStateWriter::new(scene, &actions);
        self.serialized = self.changes;

        let result = writer.write_into(out);
        self.writer = Some(writer);
        result
    }

    fn dispatch(&mut self, event: &ActionEvent) -> Result<()> {
        match event.kind {
            ActionKind::Reset => {
                if let Some(ref mut scene) = self.scene {
                    scene.reset();
                }
                self.prefs = DecoderPrefs::default();
            }
            ActionKind::DrcSelected => self.prefs.drc_selected = Some(int_param(event)?),
            ActionKind::Boost => self.prefs.boost = Some(float_param(event)?),
            ActionKind::Compress => self.prefs.compress = Some(float_param(event)?),
            ActionKind::TargetLoudness => self.prefs.target_loudness = Some(float_param(event)?),
            ActionKind::AlbumMode => self.prefs.album_mode = Some(bool_param(event)?),
            ActionKind::AccessibilityPreference => {
                self.prefs.accessibility = Some(int_param(event)?)
            }
            ActionKind::LanguageSelected => self.prefs.language = Some(text_param(event)?),
            ActionKind::PresetSelected => {
                let id = int_param(event)?;
                self.scene_mut()?.select_preset(id as u8)?;
            }
            ActionKind::GroupMute => {
                let id = int_param(event)? as u8;
                let mute = bool_param(event)?;
                self.scene_mut()?.set_group_on(id, !mute)?;
            }
            ActionKind::GroupBalance => {
                let id = int_param(event)? as u8;
                let gain = float_param(event)?;
                self.scene_mut()?.set_group_gain(id, gain)?;
            }
            ActionKind::GroupAzimuth => {
                let id = int_param(event)? as u8;
                let azimuth = float_param(event)?;
                self.scene_mut()?.set_group_azimuth(id, azimuth)?;
            }
            ActionKind::GroupElevation => {
                let id = int_param(event)? as u8;
                let elevation = float_param(event)?;
                self.scene_mut()?.set_group_elevation(id, elevation)?;
            }
            ActionKind::SwitchGroupMute => {
                let id = int_param(event)? as u8;
                let mute = bool_param(event)?;
                self.scene_mut()?.set_switch_group_on(id, !mute)?;
            }
            ActionKind::SwitchGroupBalance => {
                let member = self.selected_member(int_param(event)? as u8)?;
                let gain = float_param(event)?;
                self.scene_mut()?.set_group_gain(member, gain)?;
            }
            ActionKind::SwitchGroupAzimuth => {
                let member = self.selected_member(int_param(event)? as u8)?;
                let azimuth = float_param(event)?;
                self.scene_mut()?.set_group_azimuth(member, azimuth)?;
            }
            ActionKind::SwitchGroupElevation => {
                let member = self.selected_member(int_param(event)? as u8)?;
                let elevation = float_param(event)?;
                self.scene_mut()?.set_group_elevation(member, elevation)?;
            }
            ActionKind::SetGuid => {
                let uuid = parse_uuid(&text_param(event)?)?;
                self.scene_mut()?.uuid = uuid;
            }
        }

        self.changes += 1;
        Ok(())
    }

    fn scene_mut(&mut self) -> Result<&mut AudioSceneInfo> {
        match self.scene {
            Some(ref mut scene) => Ok(scene),
            None => unsupported_param_error("ui: no scene configured"),
        }
    }

    /// The currently selected member group of a switch group.
    fn selected_member(&self, switch_id: u8) -> Result<u8> {
        let scene = match self.scene {
            Some(ref scene) => scene,
            None => return unsupported_param_error("ui: no scene configured"),
        };
        match scene.switch_groups().iter().find(|s| s.id == switch_id) {
            Some(sg) => Ok(sg.selected),
            None => unsupported_param_error("ui (asi): unknown switch group"),
        }
    }
}

fn int_param(event: &ActionEvent) -> Result<i32> {
    match event.param_int {
        Some(value) => Ok(value),
        None => unsupported_param_error("ui (action): missing integer parameter"),
    }
}

fn float_param(event: &ActionEvent) -> Result<f32> {
    match event.param_float {
        Some(value) => Ok(value),
        None => unsupported_param_error("ui (action): missing float parameter"),
    }
}

fn bool_param(event: &ActionEvent) -> Result<bool> {
    match event.param_bool {
        Some(value) => Ok(value),
        None => unsupported_param_error("ui (action): missing boolean parameter"),
    }
}

fn text_param(event: &ActionEvent) -> Result<String> {
    match event.param_text {
        Some(ref value) => Ok(value.clone()),
        None => unsupported_param_error("ui (action): missing text parameter"),
    }
}

/// Parse a canonical or dash-less hex UUID.
fn parse_uuid(text: &str) -> Result<[u8; 16]> {
    let mut uuid = [0u8; 16];
    let mut nibbles = 0usize;

    for c in text.chars() {
        if c == '-' {
            continue;
        }
        let digit = match c.to_digit(16) {
            Some(digit) => digit as u8,
            None => return decode_error("ui: malformed uuid"),
        };
        if nibbles >= 32 {
            return decode_error("ui: malformed uuid");
        }
        uuid[nibbles / 2] = (uuid[nibbles / 2] << 4) | digit;
        nibbles += 1;
    }

    if nibbles != 32 {
        return decode_error("ui: malformed uuid");
    }
    Ok(uuid)
}

/// Render the scene's divergence from its transmitted defaults as action events.
fn scene_actions(scene: &AudioSceneInfo) -> Vec<ActionEvent> {
    let mut actions = Vec::new();

    if let Some(preset) = scene.selected_preset() {
        actions.push(ActionEvent::new(ActionKind::PresetSelected).with_int(i32::from(preset)));
    }

    for group in scene.groups() {
        let id = i32::from(group.id);
        if group.on != group.default_on {
            actions
                .push(ActionEvent::new(ActionKind::GroupMute).with_int(id).with_bool(!group.on));
        }
        if group.gain_db != 0.0 {
            actions.push(
                ActionEvent::new(ActionKind::GroupBalance).with_int(id).with_float(group.gain_db),
            );
        }
        if group.azimuth != 0.0 {
            actions.push(
                ActionEvent::new(ActionKind::GroupAzimuth).with_int(id).with_float(group.azimuth),
            );
        }
        if group.elevation != 0.0 {
            actions.push(
                ActionEvent::new(ActionKind::GroupElevation)
                    .with_int(id)
                    .with_float(group.elevation),
            );
        }
    }

    for sg in scene.switch_groups() {
        if !sg.on {
            actions.push(
                ActionEvent::new(ActionKind::SwitchGroupMute)
                    .with_int(i32::from(sg.id))
                    .with_bool(true),
            );
        }
    }

    actions
}

/// Render the decoder preferences as action events.
fn prefs_actions(prefs: &DecoderPrefs) -> Vec<ActionEvent> {
    let mut actions = Vec::new();

    if let Some(value) = prefs.drc_selected {
        actions.push(ActionEvent::new(ActionKind::DrcSelected).with_int(value));
    }
    if let Some(value) = prefs.boost {
        actions.push(ActionEvent::new(ActionKind::Boost).with_float(value));
    }
    if let Some(value) = prefs.compress {
        actions.push(ActionEvent::new(ActionKind::Compress).with_float(value));
    }
    if let Some(value) = prefs.target_loudness {
        actions.push(ActionEvent::new(ActionKind::TargetLoudness).with_float(value));
    }
    if let Some(value) = prefs.album_mode {
        actions.push(ActionEvent::new(ActionKind::AlbumMode).with_bool(value));
    }
    if let Some(value) = prefs.accessibility {
        actions.push(ActionEvent::new(ActionKind::AccessibilityPreference).with_int(value));
    }
    if let Some(ref value) = prefs.language {
        actions.push(ActionEvent::new(ActionKind::LanguageSelected).with_text(value.clone()));
    }

    actions
}
