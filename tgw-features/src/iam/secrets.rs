// Copyright 2026 S4Core Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Identifier and secret generation.
//!
//! All randomness comes from the operating system CSPRNG.

use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::OsRng;
use rand::Rng;

const UPPER_ALPHANUMERIC: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Length of a secret access key.
pub const SECRET_ACCESS_KEY_LEN: usize = 40;

fn os_random(size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    OsRng.fill(bytes.as_mut_slice());
    bytes
}

/// Generates an access key id (`AKIA` + 16 chars, 20 total).
pub fn generate_access_key_id() -> String {
    format!("AKIA{}", nanoid::nanoid!(16, &UPPER_ALPHANUMERIC, os_random))
}

/// Generates a user id (`AIDA` + 17 chars).
pub fn generate_user_id() -> String {
    format!("AIDA{}", nanoid::nanoid!(17, &UPPER_ALPHANUMERIC, os_random))
}

/// Generates a 40-character secret access key.
pub fn generate_secret_access_key() -> String {
    Alphanumeric
        .sample_iter(OsRng)
        .take(SECRET_ACCESS_KEY_LEN)
        .map(char::from)
        .collect()
}

/// Generates a 12-digit account id.
pub fn generate_account_id() -> String {
    format!("{:012}", OsRng.gen_range(100_000_000_000u64..1_000_000_000_000u64))
}
