// Copyright (C) 2020-2025  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng as _;

/// Upper bound (exclusive) of the random starting serial.
const SEED_BOUND: u32 = 100;

/// Allocator of serial numbers for CA-signed certificates.
///
/// Serials are unique among concurrent callers of one counter until the
/// `u32` range wraps; `0` is never handed out.  This only avoids collisions
/// within one run and is not a secure serial number source.
#[derive(Debug)]
pub struct SerialCounter(AtomicU32);

impl SerialCounter {
    /// Counter whose first serial is `start` (or `1` if `start` is `0`).
    pub fn new(start: u32) -> Self {
        Self(AtomicU32::new(start))
    }

    /// Counter starting at a random value below 100.
    pub fn seeded() -> Self {
        Self::new(rand::rng().random_range(1..SEED_BOUND))
    }

    /// Allocates the next serial number.
    pub fn next(&self) -> u32 {
        loop {
            // `fetch_add` wraps on overflow.
            let serial = self.0.fetch_add(1, Ordering::Relaxed);
            if serial != 0 {
                return serial;
            }
        }
    }

    /// Allocates the next serial, formatted for `-set_serial`.
    pub fn next_serial(&self) -> String {
        format!("0{}", self.next())
    }
}

impl Default for SerialCounter {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn serials_increase() {
        let counter = SerialCounter::new(7);

        assert_eq!(counter.next(), 7);
        assert_eq!(counter.next(), 8);
        assert_eq!(counter.next_serial(), "09");
    }

    #[test]
    fn wraps_without_handing_out_zero() {
        let counter = SerialCounter::new(u32::MAX);

        assert_eq!(counter.next(), u32::MAX);
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn seeded_start_is_small_and_nonzero() {
        let first = SerialCounter::seeded().next();

        assert!((1..SEED_BOUND).contains(&first));
    }

    #[test]
    fn concurrent_allocation_has_no_duplicates() {
        let counter = SerialCounter::new(1);

        let serials: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..100).map(|_| counter.next()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = serials.iter().collect();
        assert_eq!(unique.len(), 800);
    }
}
