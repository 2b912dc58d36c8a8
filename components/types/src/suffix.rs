// Copyright 2026 sunder
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::err::{Result, SuffixNamespaceTooSmallSnafu};
use sunder_common::ChunkIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuffixAlphabet {
    /// `a..z`, base 26.
    Alpha,
    /// `0..9`, base 10.
    Numeric,
}

impl SuffixAlphabet {
    fn base(&self) -> u64 {
        match self {
            SuffixAlphabet::Alpha => 26,
            SuffixAlphabet::Numeric => 10,
        }
    }
}

impl Display for SuffixAlphabet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SuffixAlphabet::Alpha => write!(f, "alphabetic"),
            SuffixAlphabet::Numeric => write!(f, "numeric"),
        }
    }
}

/// Maps a 1-based chunk index to a fixed-width object name suffix.
///
/// Contract: for any `i < j` within [`capacity`](Self::capacity),
/// `render(i)` sorts lexicographically before `render(j)`. The recombiner
/// leans on this to fold chunks back in index order from a plain listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixScheme {
    pub alphabet: SuffixAlphabet,
    pub length: usize,
}

impl SuffixScheme {
    pub fn alphabetic(length: usize) -> Self {
        SuffixScheme { alphabet: SuffixAlphabet::Alpha, length }
    }

    pub fn numeric(length: usize) -> Self {
        SuffixScheme { alphabet: SuffixAlphabet::Numeric, length }
    }

    /// Number of distinct suffixes, saturating at `u64::MAX`. A namespace
    /// larger than any representable chunk count imposes no limit.
    pub fn capacity(&self) -> u64 { self.alphabet.base().saturating_pow(self.length as u32) }

    /// Fails when `count` chunks would not fit into the namespace. Checked
    /// once at planning time, before any chunk object is written.
    pub fn ensure_capacity(&self, count: u64) -> Result<()> {
        let capacity = self.capacity();
        ensure!(
            count <= capacity,
            SuffixNamespaceTooSmallSnafu {
                alphabet: self.alphabet,
                length: self.length,
                capacity,
                count,
            }
        );
        Ok(())
    }

    /// Renders the suffix for a 1-based chunk index: `index - 1` written
    /// most-significant-digit first in the alphabet's base, zero-padded to
    /// the configured width.
    pub fn render(&self, index: ChunkIndex) -> String {
        debug_assert!(index >= 1, "chunk indices are 1-based");
        debug_assert!(index <= self.capacity(), "index {index} exceeds namespace");
        let ordinal = index - 1;
        match self.alphabet {
            SuffixAlphabet::Numeric => format!("{ordinal:0width$}", width = self.length),
            SuffixAlphabet::Alpha => {
                let mut buf = vec![b'a'; self.length];
                let mut rem = ordinal;
                for slot in buf.iter_mut().rev() {
                    *slot = b'a' + (rem % 26) as u8;
                    rem /= 26;
                }
                // buf holds only ASCII letters.
                String::from_utf8(buf).expect("alphabetic suffix is ascii")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_renders_base26() {
        let s = SuffixScheme::alphabetic(2);
        assert_eq!(s.render(1), "aa");
        assert_eq!(s.render(2), "ab");
        assert_eq!(s.render(26), "az");
        assert_eq!(s.render(27), "ba");
        assert_eq!(s.render(676), "zz");
    }

    #[test]
    fn numeric_renders_padded() {
        let s = SuffixScheme::numeric(3);
        assert_eq!(s.render(1), "000");
        assert_eq!(s.render(10), "009");
        assert_eq!(s.render(1000), "999");
    }

    #[test]
    fn suffixes_sort_in_index_order() {
        for scheme in [SuffixScheme::alphabetic(2), SuffixScheme::numeric(2)] {
            let mut prev = scheme.render(1);
            for index in 2..=scheme.capacity() {
                let next = scheme.render(index);
                assert!(prev < next, "{prev} should sort before {next}");
                prev = next;
            }
        }
    }

    #[test]
    fn capacity_per_alphabet() {
        assert_eq!(SuffixScheme::alphabetic(2).capacity(), 676);
        assert_eq!(SuffixScheme::numeric(2).capacity(), 100);
        assert_eq!(SuffixScheme::alphabetic(1).capacity(), 26);
        // 26^16 overflows u64 and saturates; anything representable fits.
        assert_eq!(SuffixScheme::alphabetic(16).capacity(), u64::MAX);
    }

    #[test]
    fn ensure_capacity_rejects_overflow() {
        let s = SuffixScheme::alphabetic(2);
        assert!(s.ensure_capacity(676).is_ok());
        let err = s.ensure_capacity(700).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::SuffixNamespaceTooSmall { capacity: 676, count: 700, .. }
        ));

        let s = SuffixScheme::numeric(2);
        assert!(s.ensure_capacity(100).is_ok());
        assert!(s.ensure_capacity(101).is_err());
    }
}
