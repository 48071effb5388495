// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Restartable XML serialization of the scene state.
//!
//! The scene state is exchanged with the renderer as a small XML document of `<ActionEvent/>`
//! elements. The caller provides the output buffer and it may be smaller than the document:
//! output is truncated only at element boundaries, and the next call continues with the exact
//! element where truncation occurred.

use std::fmt::Write;

use bitflags::bitflags;

use crate::action::ActionEvent;
use crate::asi::AudioSceneInfo;

/// The protocol version stamped on every element.
const XML_VERSION: u32 = 2;

bitflags! {
    /// Request flags for the XML state output.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct UiRequest: u32 {
        /// Produce the document even if the state did not change.
        const FORCE_UPDATE = 0x1;
        /// Discard a pending continuation and restart from the document head.
        const FORCE_RESTART_XML = 0x2;
    }
}

bitflags! {
    /// Response flags of the XML state output.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct UiResponse: u32 {
        /// The state did not change; no document was produced.
        const NO_CHANGE = 0x1;
        /// This output continues a document truncated by a previous call.
        const CONTINUES_XML = 0x2;
        /// The document did not fit; call again to receive the remainder.
        const INCOMPLETE_XML = 0x4;
        /// The buffer cannot hold even one element; nothing was written.
        const SHORT_OUTPUT = 0x8;
    }
}

/// Format a scene UUID in the canonical 8-4-4-4-12 form.
pub fn format_uuid(uuid: &[u8; 16]) -> String {
    let mut out = String::with_capacity(36);
    for (i, byte) in uuid.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        // Writing hex into a String cannot fail.
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Escape a string for use in an XML attribute value.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// A restartable writer for one rendition of the scene state document.
pub struct UiStateWriter {
    /// The document split at element boundaries, the only positions output may stop at.
    elements: Vec<String>,
    next: usize,
}

impl UiStateWriter {
    /// Render the document for `scene` and the given action events.
    pub fn new(scene: &AudioSceneInfo, actions: &[ActionEvent]) -> UiStateWriter {
        let uuid = format_uuid(&scene.uuid);

        let mut elements = Vec::with_capacity(actions.len() + 2);
        elements
            .push(format!("<AudioSceneConfig uuid=\"{}\" version=\"{}\">", uuid, XML_VERSION));

        for action in actions {
            let mut element = format!(
                "<ActionEvent uuid=\"{}\" version=\"{}\" actionType=\"{}\"",
                uuid,
                XML_VERSION,
                action.kind.code()
            );
            if let Some(value) = action.param_int {
                // Writing into a String cannot fail.
                let _ = write!(element, " paramInt=\"{}\"", value);
            }
            if let Some(value) = action.param_float {
                let _ = write!(element, " paramFloat=\"{}\"", value);
            }
            if let Some(value) = action.param_bool {
                let _ = write!(element, " paramBool=\"{}\"", u8::from(value));
            }
            if let Some(ref value) = action.param_text {
                let _ = write!(element, " paramText=\"{}\"", escape(value));
            }
            element.push_str("/>");
            elements.push(element);
        }

        elements.push("</AudioSceneConfig>".to_string());

        UiStateWriter { elements, next: 0 }
    }

    /// Restart output from the document head.
    pub fn restart(&mut self) {
        self.next = 0;
    }

    /// True once the whole document was written.
    pub fn is_finished(&self) -> bool {
        self.next >= self.elements.len()
    }

    /// Write as many whole elements as fit into `out`. Returns the response flags and the number
    /// of bytes written.
    pub fn write_into(&mut self, out: &mut [u8]) -> (UiResponse, usize) {
        let continuing = self.next > 0;
        let mut written = 0;

        while self.next < self.elements.len() {
            let element = self.elements[self.next].as_bytes();
            if written + element.len() > out.len() {
                break;
            }
            out[written..written + element.len()].copy_from_slice(element);
            written += element.len();
            self.next += 1;
        }

        let mut response = UiResponse::empty();

        if written == 0 && !self.is_finished() {
            return (UiResponse::SHORT_OUTPUT, 0);
        }
        if continuing {
            response |= UiResponse::CONTINUES_XML;
        }
        if !self.is_finished() {
            response |= UiResponse::INCOMPLETE_XML;
        }

        (response, written)
    }
}
