// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `drc` module defines the dynamic range control parameters a caller may adjust at runtime.

use crate::errors::{unsupported_param_error, Result};

/// A runtime-adjustable DRC parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrcParam {
    /// Desired output reference level in steps of -0.25 LU. Valid range: [40, 127].
    TargetReferenceLevel,
    /// MPEG-D DRC effect type request. Valid range: [-1, 6], where -1 leaves the choice to the
    /// decoder.
    EffectType,
    /// DRC boost factor in steps of 1/127. Valid range: [0, 127].
    BoostFactor,
    /// DRC attenuation factor in steps of 1/127. Valid range: [0, 127].
    AttenuationFactor,
    /// Album mode. Valid range: {0, 1}.
    AlbumMode,
}

/// A set of DRC parameter values.
///
/// Each parameter is independently settable; a parameter that was never set stays `None` and the
/// elementary decoder keeps its default. The desired/applied pair kept by the decoder session are
/// both instances of this structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrcParams {
    pub target_reference_level: Option<i32>,
    pub effect_type: Option<i32>,
    pub boost_factor: Option<i32>,
    pub attenuation_factor: Option<i32>,
    pub album_mode: Option<i32>,
}

impl DrcParams {
    pub fn new() -> Self {
        Default::default()
    }

    /// Validate `value` against the range of `param` and store it. An out-of-range value is
    /// rejected and the previously stored value is left unchanged.
    pub fn set(&mut self, param: DrcParam, value: i32) -> Result<()> {
        match param {
            DrcParam::TargetReferenceLevel => {
                if value < 40 || value > 127 {
                    return unsupported_param_error("drc: target reference level out of range");
                }
                self.target_reference_level = Some(value);
            }
            DrcParam::EffectType => {
                if value < -1 || value > 6 {
                    return unsupported_param_error("drc: effect type out of range");
                }
                self.effect_type = Some(value);
            }
            DrcParam::BoostFactor => {
                if value < 0 || value > 127 {
                    return unsupported_param_error("drc: boost factor out of range");
                }
                self.boost_factor = Some(value);
            }
            DrcParam::AttenuationFactor => {
                if value < 0 || value > 127 {
                    return unsupported_param_error("drc: attenuation factor out of range");
                }
                self.attenuation_factor = Some(value);
            }
            DrcParam::AlbumMode => {
                if value != 0 && value != 1 {
                    return unsupported_param_error("drc: album mode out of range");
                }
                self.album_mode = Some(value);
            }
        }
        Ok(())
    }

    /// True if no parameter was ever set.
    pub fn is_empty(&self) -> bool {
        self.target_reference_level.is_none()
            && self.effect_type.is_none()
            && self.boost_factor.is_none()
            && self.attenuation_factor.is_none()
            && self.album_mode.is_none()
    }
}
