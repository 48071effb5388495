// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio Scene Information.
//!
//! The ASI record describes the interactive structure of a stream: groups of audio elements,
//! switch groups selecting exactly one member at a time, and presets bundling on/off states. Each
//! interactive capability is gated by an `allow*` flag transmitted in the ASI; a mutation the
//! scene forbids is rejected and leaves the state untouched.

use log::debug;

use euphonia_core::errors::{unsupported_param_error, Result};

/// The interactivity capabilities and ranges of one group, as transmitted in the ASI.
#[derive(Copy, Clone, Debug)]
pub struct Interactivity {
    /// The listener may switch the group on and off.
    pub allow_on_off: bool,
    /// The listener may change the group gain.
    pub allow_gain: bool,
    /// The listener may re-position the group.
    pub allow_position: bool,
    /// Gain interactivity range in dB.
    pub min_gain_db: f32,
    pub max_gain_db: f32,
    /// Azimuth offset range in degrees.
    pub min_azimuth: f32,
    pub max_azimuth: f32,
    /// Elevation offset range in degrees.
    pub min_elevation: f32,
    pub max_elevation: f32,
}

impl Default for Interactivity {
    fn default() -> Self {
        Interactivity {
            allow_on_off: false,
            allow_gain: false,
            allow_position: false,
            min_gain_db: -63.0,
            max_gain_db: 31.0,
            min_azimuth: -180.0,
            max_azimuth: 180.0,
            min_elevation: -90.0,
            max_elevation: 90.0,
        }
    }
}

impl Interactivity {
    /// Capabilities allowing every mutation with the default ranges.
    pub fn all() -> Self {
        Interactivity {
            allow_on_off: true,
            allow_gain: true,
            allow_position: true,
            ..Default::default()
        }
    }
}

/// One group of audio elements.
#[derive(Clone, Debug)]
pub struct Group {
    pub id: u8,
    pub interactivity: Interactivity,
    /// The transmitted default on/off state, restored on reset.
    pub default_on: bool,
    pub on: bool,
    /// User gain offset in dB.
    pub gain_db: f32,
    /// User azimuth offset in degrees.
    pub azimuth: f32,
    /// User elevation offset in degrees.
    pub elevation: f32,
}

impl Group {
    pub fn new(id: u8, interactivity: Interactivity, default_on: bool) -> Group {
        Group {
            id,
            interactivity,
            default_on,
            on: default_on,
            gain_db: 0.0,
            azimuth: 0.0,
            elevation: 0.0,
        }
    }
}

/// A switch group: of its member groups, exactly one is active at a time.
#[derive(Clone, Debug)]
pub struct SwitchGroup {
    pub id: u8,
    pub allow_on_off: bool,
    /// Member group ids.
    pub members: Vec<u8>,
    pub default_member: u8,
    pub selected: u8,
    pub on: bool,
}

impl SwitchGroup {
    pub fn new(id: u8, allow_on_off: bool, members: Vec<u8>, default_member: u8) -> SwitchGroup {
        SwitchGroup { id, allow_on_off, members, default_member, selected: default_member, on: true }
    }
}

/// A preset condition: a group forced on or off while the preset is selected.
#[derive(Copy, Clone, Debug)]
pub struct PresetCondition {
    pub group_id: u8,
    pub on: bool,
}

/// A group preset.
#[derive(Clone, Debug)]
pub struct GroupPreset {
    pub id: u8,
    pub conditions: Vec<PresetCondition>,
}

/// The interactive scene state of one stream.
#[derive(Clone, Debug, Default)]
pub struct AudioSceneInfo {
    /// The UUID identifying this scene, used as the persistence key.
    pub uuid: [u8; 16],
    groups: Vec<Group>,
    switch_groups: Vec<SwitchGroup>,
    presets: Vec<GroupPreset>,
    selected_preset: Option<u8>,
    /// Bumped on every successful mutation; drives change detection for the XML output.
    changes: u64,
}

impl AudioSceneInfo {
    pub fn new(uuid: [u8; 16]) -> AudioSceneInfo {
        AudioSceneInfo { uuid, ..Default::default() }
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub fn add_switch_group(&mut self, group: SwitchGroup) {
        self.switch_groups.push(group);
    }

    pub fn add_preset(&mut self, preset: GroupPreset) {
        self.presets.push(preset);
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn switch_groups(&self) -> &[SwitchGroup] {
        &self.switch_groups
    }

    pub fn presets(&self) -> &[GroupPreset] {
        &self.presets
    }

    pub fn selected_preset(&self) -> Option<u8> {
        self.selected_preset
    }

    /// The number of successful mutations since the scene was created.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    fn group_mut(&mut self, id: u8) -> Result<&mut Group> {
        match self.groups.iter_mut().find(|g| g.id == id) {
            Some(group) => Ok(group),
            None => unsupported_param_error("ui (asi): unknown group"),
        }
    }

    /// Switch a group on or off. Gated by the group's `allow_on_off` capability.
    pub fn set_group_on(&mut self, id: u8, on: bool) -> Result<()> {
        let group = self.group_mut(id)?;
        if !group.interactivity.allow_on_off {
            return unsupported_param_error("ui (asi): group on/off interactivity not allowed");
        }
        group.on = on;
        self.changes += 1;
        Ok(())
    }

    /// Adjust a group's gain offset. Gated by `allow_gain` and the transmitted range.
    pub fn set_group_gain(&mut self, id: u8, gain_db: f32) -> Result<()> {
        let group = self.group_mut(id)?;
        if !group.interactivity.allow_gain {
            return unsupported_param_error("ui (asi): group gain interactivity not allowed");
        }
        if gain_db < group.interactivity.min_gain_db || gain_db > group.interactivity.max_gain_db {
            return unsupported_param_error("ui (asi): group gain out of range");
        }
        group.gain_db = gain_db;
        self.changes += 1;
        Ok(())
    }

    /// Adjust a group's azimuth offset. Gated by `allow_position` and the transmitted range.
    pub fn set_group_azimuth(&mut self, id: u8, azimuth: f32) -> Result<()> {
        let group = self.group_mut(id)?;
        if !group.interactivity.allow_position {
            return unsupported_param_error("ui (asi): group position interactivity not allowed");
        }
        if azimuth < group.interactivity.min_azimuth || azimuth > group.interactivity.max_azimuth {
            return unsupported_param_error("ui (asi): group azimuth out of range");
        }
        group.azimuth = azimuth;
        self.changes += 1;
        Ok(())
    }

    /// Adjust a group's elevation offset. Gated by `allow_position` and the transmitted range.
    pub fn set_group_elevation(&mut self, id: u8, elevation: f32) -> Result<()> {
        let group = self.group_mut(id)?;
        if !group.interactivity.allow_position {
            return unsupported_param_error("ui (asi): group position interactivity not allowed");
        }
        if elevation < group.interactivity.min_elevation
            || elevation > group.interactivity.max_elevation
        {
            return unsupported_param_error("ui (asi): group elevation out of range");
        }
        group.elevation = elevation;
        self.changes += 1;
        Ok(())
    }

    /// Select a preset and apply its conditions to the member groups. Preset conditions override
    /// the per-group `allow_on_off` gate: the broadcaster authored both.
    pub fn select_preset(&mut self, id: u8) -> Result<()> {
        let preset = match self.presets.iter().find(|p| p.id == id) {
            Some(preset) => preset.clone(),
            None => return unsupported_param_error("ui (asi): unknown preset"),
        };

        for condition in &preset.conditions {
            if let Some(group) = self.groups.iter_mut().find(|g| g.id == condition.group_id) {
                group.on = condition.on;
            }
        }

        debug!("preset {} selected ({} conditions)", id, preset.conditions.len());
        self.selected_preset = Some(id);
        self.changes += 1;
        Ok(())
    }

    /// Select the active member of a switch group. The previously selected member is switched
    /// off, the new one on.
    pub fn select_switch_member(&mut self, switch_id: u8, member_id: u8) -> Result<()> {
        let sg = match self.switch_groups.iter_mut().find(|s| s.id == switch_id) {
            Some(sg) => sg,
            None => return unsupported_param_error("ui (asi): unknown switch group"),
        };
        if !sg.members.contains(&member_id) {
            return unsupported_param_error("ui (asi): group is not a switch group member");
        }

        let previous = sg.selected;
        sg.selected = member_id;

        for group in self.groups.iter_mut() {
            if group.id == previous {
                group.on = false;
            }
            else if group.id == member_id {
                group.on = true;
            }
        }

        self.changes += 1;
        Ok(())
    }

    /// Switch a whole switch group on or off. Gated by the switch group's `allow_on_off`.
    pub fn set_switch_group_on(&mut self, switch_id: u8, on: bool) -> Result<()> {
        let sg = match self.switch_groups.iter_mut().find(|s| s.id == switch_id) {
            Some(sg) => sg,
            None => return unsupported_param_error("ui (asi): unknown switch group"),
        };
        if !sg.allow_on_off {
            return unsupported_param_error("ui (asi): switch group on/off not allowed");
        }

        sg.on = on;
        let selected = sg.selected;

        if let Some(group) = self.groups.iter_mut().find(|g| g.id == selected) {
            group.on = on;
        }

        self.changes += 1;
        Ok(())
    }

    /// Restore every group to its transmitted defaults and deselect the preset.
    pub fn reset(&mut self) {
        for group in self.groups.iter_mut() {
            group.on = group.default_on;
            group.gain_db = 0.0;
            group.azimuth = 0.0;
            group.elevation = 0.0;
        }
        for sg in self.switch_groups.iter_mut() {
            sg.selected = sg.default_member;
            sg.on = true;
        }
        self.selected_preset = None;
        self.changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AudioSceneInfo, Group, GroupPreset, Interactivity, PresetCondition, SwitchGroup,
    };

    fn test_scene() -> AudioSceneInfo {
        let mut scene = AudioSceneInfo::new([0xab; 16]);

        scene.add_group(Group::new(1, Interactivity::all(), true));
        scene.add_group(Group::new(2, Interactivity::default(), true));
        scene.add_group(Group::new(3, Interactivity::all(), false));
        scene.add_group(Group::new(4, Interactivity::all(), false));

        scene.add_switch_group(SwitchGroup::new(10, true, vec![3, 4], 3));
        scene.add_preset(GroupPreset {
            id: 20,
            conditions: vec![
                PresetCondition { group_id: 1, on: false },
                PresetCondition { group_id: 2, on: true },
            ],
        });

        scene
    }

    #[test]
    fn verify_capability_gates() {
        let mut scene = test_scene();

        // Group 1 allows everything.
        assert!(scene.set_group_on(1, false).is_ok());
        assert!(scene.set_group_gain(1, 6.0).is_ok());

        // Group 2 allows nothing; its state must not change.
        assert!(scene.set_group_on(2, false).is_err());
        assert!(scene.set_group_gain(2, 6.0).is_err());
        assert!(scene.set_group_azimuth(2, 10.0).is_err());
        assert!(scene.groups()[1].on);
        assert_eq!(scene.groups()[1].gain_db, 0.0);
    }

    #[test]
    fn verify_range_gates() {
        let mut scene = test_scene();

        assert!(scene.set_group_gain(1, 32.0).is_err());
        assert!(scene.set_group_gain(1, -64.0).is_err());
        assert_eq!(scene.groups()[0].gain_db, 0.0);

        assert!(scene.set_group_azimuth(1, 181.0).is_err());
        assert!(scene.set_group_elevation(1, 90.0).is_ok());
    }

    #[test]
    fn verify_preset_application() {
        let mut scene = test_scene();

        scene.select_preset(20).unwrap();
        assert_eq!(scene.selected_preset(), Some(20));

        // The preset switched group 1 off even though a direct mutation would also have been
        // allowed, and left the switch group members alone.
        assert!(!scene.groups()[0].on);
        assert!(scene.groups()[1].on);

        assert!(scene.select_preset(99).is_err());
    }

    #[test]
    fn verify_switch_selection() {
        let mut scene = test_scene();

        scene.select_switch_member(10, 4).unwrap();
        assert!(!scene.groups()[2].on);
        assert!(scene.groups()[3].on);

        // A non-member is rejected and the selection stays.
        assert!(scene.select_switch_member(10, 1).is_err());
        assert_eq!(scene.switch_groups()[0].selected, 4);
    }

    #[test]
    fn verify_reset_restores_defaults() {
        let mut scene = test_scene();

        scene.set_group_on(1, false).unwrap();
        scene.set_group_gain(1, 6.0).unwrap();
        scene.select_switch_member(10, 4).unwrap();
        scene.select_preset(20).unwrap();

        scene.reset();

        assert!(scene.groups()[0].on);
        assert_eq!(scene.groups()[0].gain_db, 0.0);
        assert_eq!(scene.switch_groups()[0].selected, 3);
        assert_eq!(scene.selected_preset(), None);
    }

    #[test]
    fn verify_mutations_bump_change_count() {
        let mut scene = test_scene();
        let before = scene.change_count();

        scene.set_group_on(1, false).unwrap();
        assert_eq!(scene.change_count(), before + 1);

        // A rejected mutation must not count as a change.
        assert!(scene.set_group_on(2, false).is_err());
        assert_eq!(scene.change_count(), before + 1);
    }
}
