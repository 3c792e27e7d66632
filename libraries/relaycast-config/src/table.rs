//! Canonical string tables for closed enums

/// Case-insensitive lookup of `s` in `table`, ignoring surrounding whitespace.
pub(crate) fn parse<T: Copy>(table: &[(T, &'static str)], s: &str) -> Option<T> {
    let s = s.trim();
    table
        .iter()
        .find(|(_, name)| s.eq_ignore_ascii_case(name))
        .map(|(value, _)| *value)
}

/// Canonical spelling of `value`.
pub(crate) fn name_of<T: Copy + PartialEq>(table: &[(T, &'static str)], value: T) -> &'static str {
    table
        .iter()
        .find(|(v, _)| *v == value)
        .map_or("", |(_, name)| name)
}
