//! File and folder name sanitizing.
//!
//! Names pass through two phases, in this order:
//! 1. every rule of the character table is applied in insertion order, once
//!    as written and once upper-cased, each rule seeing the output of the
//!    previous one
//! 2. characters that are illegal in file names on common filesystems are
//!    removed
//!
//! An empty result is returned as-is; avoiding collisions is up to the caller.

use crate::rules::CharacterTable;

/// Characters stripped from every name.
pub const INVALID_CHARACTERS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces characters according to the character table.
///
/// # Examples
///
/// ```
/// use ocd::rules::CharacterTable;
/// use ocd::sanitize::replace_characters;
///
/// let table: CharacterTable = [("å", "a".to_string())].into_iter().collect();
/// assert_eq!(replace_characters("Håkan Åberg", &table), "Hakan Aberg");
/// ```
pub fn replace_characters(name: &str, characters: &CharacterTable) -> String {
    let mut output = name.to_string();
    for (pattern, replacement) in characters.iter() {
        if pattern.is_empty() {
            continue;
        }
        output = output.replace(pattern, replacement);

        let upper_pattern = pattern.to_uppercase();
        if upper_pattern != pattern {
            output = output.replace(&upper_pattern, &replacement.to_uppercase());
        }
    }
    output
}

/// Removes illegal characters.
pub fn remove_characters(name: &str) -> String {
    name.chars().filter(|c| !is_invalid(*c)).collect()
}

/// Substitutes, then strips what is still illegal.
///
/// # Examples
///
/// ```
/// use ocd::rules::CharacterTable;
/// use ocd::sanitize::sanitize;
///
/// let table: CharacterTable = [(" ", "_".to_string())].into_iter().collect();
/// assert_eq!(sanitize("My File: v2.txt", &table), "My_File_v2.txt");
/// ```
pub fn sanitize(name: &str, characters: &CharacterTable) -> String {
    remove_characters(&replace_characters(name, characters))
}

fn is_invalid(c: char) -> bool {
    INVALID_CHARACTERS.contains(&c) || c.is_ascii_control()
}
