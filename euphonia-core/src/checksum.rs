// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `checksum` module provides implementations of common error-detecting codes.

use lazy_static::lazy_static;

lazy_static! {
    /// Table-driven CRC16 (ANSI) lookup table for the polynomial 0x8005 (bit-reflected).
    static ref CRC16_ANSI_TABLE: [u16; 256] = {
        const POLY: u16 = 0xa001;

        let mut table = [0u16; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u16;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            }
            *entry = crc;
        }
        table
    };
}

/// CRC16, ANSI variant, using the polynomial 0x8005.
#[derive(Clone, Debug)]
pub struct Crc16Ansi {
    crc: u16,
}

impl Crc16Ansi {
    /// Instantiate a new checksum with the given initial state.
    pub fn new(init: u16) -> Self {
        Crc16Ansi { crc: init }
    }

    /// Process a single byte.
    pub fn process_byte(&mut self, byte: u8) {
        self.crc = (self.crc >> 8) ^ CRC16_ANSI_TABLE[usize::from((self.crc & 0xff) as u8 ^ byte)];
    }

    /// Process a buffer of bytes.
    pub fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }

    /// Get the checksum.
    pub fn crc(&self) -> u16 {
        self.crc
    }
}

#[cfg(test)]
mod tests {
    use super::Crc16Ansi;

    #[test]
    fn verify_crc16_ansi() {
        // CRC-16/ARC check value for the standard "123456789" test vector.
        let mut crc = Crc16Ansi::new(0);
        crc.process_buf_bytes(b"123456789");
        assert_eq!(crc.crc(), 0xbb3d);
    }

    #[test]
    fn verify_crc16_detects_corruption() {
        let mut a = Crc16Ansi::new(0);
        a.process_buf_bytes(&[0x10, 0x20, 0x30, 0x40]);

        let mut b = Crc16Ansi::new(0);
        b.process_buf_bytes(&[0x10, 0x20, 0x31, 0x40]);

        assert_ne!(a.crc(), b.crc());
    }
}
