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


//! Username and path validation.
//!
//! Mirrors the published AWS IAM constraints:
//! - username: 1-64 characters from `[A-Za-z0-9_+=,.@-]`
//! - path: 1-512 printable ASCII characters, starting and ending with `/`,
//!   with no empty segments

use super::error::IamError;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 64;

/// Maximum IAM path length.
pub const MAX_PATH_LEN: usize = 512;

/// Default IAM path.
pub const DEFAULT_PATH: &str = "/";

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '=' | ',' | '.' | '@' | '-')
}

/// Returns true if `username` satisfies the IAM username format.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username.chars().all(is_username_char)
}

/// Returns true if `path` satisfies the IAM path format.
pub fn is_valid_iam_path(path: &str) -> bool {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return false;
    }
    if !path.starts_with('/') || !path.ends_with('/') {
        return false;
    }
    if !path.chars().all(|c| ('\u{21}'..='\u{7E}').contains(&c)) {
        return false;
    }
    if path == DEFAULT_PATH {
        return true;
    }
    // "/a/b/" splits into ["", "a", "b", ""]; inner segments must be non-empty
    let inner = &path[1..path.len() - 1];
    inner.split('/').all(|segment| !segment.is_empty())
}

/// Validates a username, naming the offending parameter in the error.
pub fn validate_username(param: &str, username: &str) -> Result<(), IamError> {
    if username.is_empty() {
        return Err(IamError::InvalidInput(format!("{} is required", param)));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(IamError::InvalidInput(format!(
            "{} must be at most {} characters",
            param, MAX_USERNAME_LEN
        )));
    }
    if !is_valid_username(username) {
        return Err(IamError::InvalidInput(format!(
            "{} contains invalid characters: {}",
            param, username
        )));
    }
    Ok(())
}

/// Validates an IAM path, naming the offending parameter in the error.
pub fn validate_path(param: &str, path: &str) -> Result<(), IamError> {
    if !is_valid_iam_path(path) {
        return Err(IamError::InvalidInput(format!(
            "{} must begin and end with / and contain no empty segments: {}",
            param, path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_root() {
        assert!(is_valid_iam_path("/"));
    }

    #[test]
    fn test_path_nested() {
        assert!(is_valid_iam_path("/division_abc/subdivision_xyz/"));
    }

    #[test]
    fn test_path_double_slash() {
        assert!(!is_valid_iam_path("//"));
        assert!(!is_valid_iam_path("/a//b/"));
    }

    #[test]
    fn test_path_missing_slashes() {
        assert!(!is_valid_iam_path("/division_abc/subdivision_xyz"));
        assert!(!is_valid_iam_path("division_abc/subdivision_xyz/"));
        assert!(!is_valid_iam_path("division_abc"));
        assert!(!is_valid_iam_path(""));
    }

    #[test]
    fn test_path_rejects_non_printable() {
        assert!(!is_valid_iam_path("/with space/"));
        assert!(!is_valid_iam_path("/tab\t/"));
        assert!(!is_valid_iam_path(&format!("/{}/", "a".repeat(MAX_PATH_LEN))));
    }

    #[test]
    fn test_username_alphanumeric() {
        assert!(is_valid_username("myuser123"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("first.last+tag=x,y@example-co_1"));
    }

    #[test]
    fn test_username_colon_anywhere() {
        assert!(!is_valid_username(":myuser123"));
        assert!(!is_valid_username("myuser123:"));
        assert!(!is_valid_username("myuser:123"));
    }

    #[test]
    fn test_username_length() {
        assert!(!is_valid_username(""));
        assert!(is_valid_username(&"a".repeat(MAX_USERNAME_LEN)));
        assert!(!is_valid_username(&"a".repeat(MAX_USERNAME_LEN + 1)));
    }

    #[test]
    fn test_validate_username_names_param() {
        let err = validate_username("NewUserName", "bad:name").unwrap_err();
        assert_eq!(err.code(), "InvalidInput");
        assert!(err.to_string().contains("NewUserName"));
    }

    mod proptest_validation {
        use super::*;
        use proptest::prelude::*;

        fn username_strategy() -> impl Strategy<Value = String> {
            prop::string::string_regex("[A-Za-z0-9_+=,.@-]{1,64}")
                .expect("regex should be valid for username strategy")
        }

        fn path_strategy() -> impl Strategy<Value = String> {
            prop::string::string_regex("/([!-.0-~]{1,16}/){0,8}")
                .expect("regex should be valid for path strategy")
        }

        proptest! {
            #[test]
            fn allowed_usernames_validate(name in username_strategy()) {
                prop_assert!(is_valid_username(&name));
                prop_assert!(validate_username("UserName", &name).is_ok());
            }

            /// A single character outside the set invalidates any name
            #[test]
            fn foreign_char_rejects_username(
                name in username_strategy(),
                at in any::<prop::sample::Index>(),
                bad in prop::sample::select(vec![':', '/', ' ', '#', '*', '\u{e9}']),
            ) {
                let mut chars: Vec<char> = name.chars().take(MAX_USERNAME_LEN - 1).collect();
                chars.insert(at.index(chars.len() + 1), bad);
                let candidate: String = chars.into_iter().collect();
                prop_assert!(!is_valid_username(&candidate));
            }

            #[test]
            fn segment_paths_validate(path in path_strategy()) {
                prop_assert!(is_valid_iam_path(&path), "{} should be valid", path);
            }

            /// An empty segment anywhere invalidates the path
            #[test]
            fn empty_segment_rejects_path(
                path in path_strategy(),
                at in any::<prop::sample::Index>(),
            ) {
                let slashes: Vec<usize> = path.match_indices('/').map(|(i, _)| i).collect();
                let split = slashes[at.index(slashes.len())];
                let candidate = format!("{}/{}", &path[..split], &path[split..]);
                prop_assert!(!is_valid_iam_path(&candidate), "{} should be invalid", candidate);
            }
        }
    }
}
