//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Ensure a base URL ends with `/` so relative joins append to its path.
pub fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
