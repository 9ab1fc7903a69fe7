//! Name canonicalization
//!
//! Hosts disambiguate duplicated objects by appending " (N)" to the name.
//! Asset lookup wants the name the author gave, so the suffix is removed.

/// Strip host-generated duplicate suffixes such as `"Chair (2)"`.
///
/// A suffix is removed only when the name ends with `)`, the last `" ("`
/// occurs after the first character, and the text between them is made of
/// ASCII digits that fit an `i32`. Stripping repeats, so the result is a
/// fixed point: `canonical_name(canonical_name(s)) == canonical_name(s)`.
pub fn canonical_name(name: &str) -> &str {
    let mut current = name;
    while let Some(stripped) = strip_duplicate_suffix(current) {
        current = stripped;
    }
    current
}

/// Returns true if `canonical_name` would change the name
pub fn has_duplicate_suffix(name: &str) -> bool {
    strip_duplicate_suffix(name).is_some()
}

fn strip_duplicate_suffix(name: &str) -> Option<&str> {
    if !name.ends_with(')') {
        return None;
    }

    let open = name.rfind(" (")?;
    if open == 0 {
        return None;
    }

    let digits = &name[open + 2..name.len() - 1];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok()?;

    Some(&name[..open])
}
