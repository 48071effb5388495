// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MPEG-H 3D Audio user interactivity manager.
//!
//! An MPEG-H stream can describe an interactive audio scene: groups of audio elements that the
//! listener may mute, re-balance or re-position, organized into switch groups and presets. This
//! crate maintains that scene state, applies user actions gated by the scene's capability flags,
//! serializes the state to a restartable XML fragment for the renderer, and persists recent user
//! actions per scene UUID in a caller-owned memory block.
//!
//! PCM never flows through this crate; it operates purely on metadata.

pub mod action;
pub mod asi;
pub mod persist;
pub mod xml;

mod manager;

pub use manager::UiManager;
