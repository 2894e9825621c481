/*
 * message_id.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * This file is part of Conduit, an embeddable HTTP mediation engine.
 *
 * Conduit is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Conduit is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Conduit.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Unique message IDs handed to pipes at creation, for correlation across request/response stages.

use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rng() -> &'static Mutex<StdRng> {
    static RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();
    RNG.get_or_init(|| Mutex::new(StdRng::from_entropy()))
}

/// Generate `<ms-epoch-hex>.<rand32-hex>`. Unique under concurrent generation: the timestamp
/// component alone can collide within the same millisecond, the locked PRNG draw breaks the tie.
pub fn generate_message_id() -> String {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let r: u32 = rng().lock().unwrap().gen();
    format!("{:x}.{:x}", ms, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn has_timestamp_dot_random_shape() {
        let id = generate_message_id();
        let mut parts = id.split('.');
        let ts = parts.next().unwrap();
        let rand = parts.next().unwrap();
        assert!(parts.next().is_none());
        assert!(u64::from_str_radix(ts, 16).is_ok());
        assert!(u32::from_str_radix(rand, 16).is_ok());
    }

    #[test]
    fn concurrent_generation_is_unique() {
        let ids: HashSet<String> = (0..2000).map(|_| generate_message_id()).collect();
        assert_eq!(ids.len(), 2000);
    }
}
