//! Cache file naming
//!
//! A cached method is identified by the string
//! `"<Type>_<NameOrAlias>-<Param1>-<Param2>..."`. The identity is hashed once
//! into a *base name*, and the base name plus the runtime selection key is
//! hashed again into the *effective name* that appears on disk:
//!
//! ```text
//! <cache_dir>/rpc_<effective_name>           marker
//! <cache_dir>/rpc_content_<effective_name>   payload
//! ```
//!
//! MD5 is used only to keep file names short and stable. Existing caches on
//! disk depend on the exact algorithm, so it must not be swapped out.

use md5::{Digest, Md5};

/// Prefix of the marker file whose existence means "cached"
pub const MARKER_PREFIX: &str = "rpc_";

/// Prefix of the file carrying the cached payload
pub const CONTENT_PREFIX: &str = "rpc_content_";

/// Lowercase hex MD5 of the UTF-8 bytes of `input` (32 characters)
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Build the identity string of a cached method
///
/// Parameter types are appended in declaration order; their order is part of
/// the identity.
pub fn method_identity<S: AsRef<str>>(
    owner_simple: &str,
    name_or_alias: &str,
    param_types: &[S],
) -> String {
    let mut identity = String::with_capacity(
        owner_simple.len()
            + name_or_alias.len()
            + 1
            + param_types
                .iter()
                .map(|t| t.as_ref().len() + 1)
                .sum::<usize>(),
    );
    identity.push_str(owner_simple);
    identity.push('_');
    identity.push_str(name_or_alias);
    for param in param_types {
        identity.push('-');
        identity.push_str(param.as_ref());
    }
    identity
}

/// Reduce a qualified type name to its simple name
///
/// Handles both `com.example.Repo` and `my_crate::repo::Repo<T>` forms.
pub fn simple_type_name(qualified: &str) -> &str {
    let without_generics = match qualified.find('<') {
        Some(index) => &qualified[..index],
        None => qualified,
    };
    let last_path_segment = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    last_path_segment
        .rsplit('.')
        .next()
        .unwrap_or(last_path_segment)
        .trim()
}

/// Effective name of a cache slot: `md5_hex(base_name + selection_key)`
///
/// An absent key hashes like the empty string.
pub fn effective_name(base_name: &str, selection_key: Option<&str>) -> String {
    let key = selection_key.unwrap_or("");
    let mut input = String::with_capacity(base_name.len() + key.len());
    input.push_str(base_name);
    input.push_str(key);
    md5_hex(&input)
}

/// File name of the marker for an effective name
pub fn marker_file_name(effective_name: &str) -> String {
    format!("{MARKER_PREFIX}{effective_name}")
}

/// File name of the content file for an effective name
pub fn content_file_name(effective_name: &str) -> String {
    format!("{CONTENT_PREFIX}{effective_name}")
}
