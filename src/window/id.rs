//! Window identifiers.
//!
//! Ids are meant to be read by humans while debugging: `w_<type>_<n>` for
//! windows outside any session and `w_<session label>_<type>_<n>` for
//! session-scoped ones, where `n` is the lowest suffix not currently taken.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(String);

impl WindowId {
    pub fn compose(kind: &str, session_label: Option<&str>, index: usize) -> Self {
        match session_label {
            Some(label) => Self(format!("w_{label}_{kind}_{index}")),
            None => Self(format!("w_{kind}_{index}")),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for WindowId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WindowId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lowest-suffix id for `kind` under `session_label` that `is_taken` rejects.
///
/// Pure: nothing is reserved. The desktop reserves the returned id in the same
/// synchronous call, so two allocations in a row never collide.
pub fn allocate<F>(kind: &str, session_label: Option<&str>, is_taken: F) -> WindowId
where
    F: Fn(&WindowId) -> bool,
{
    let mut index = 0usize;
    loop {
        let id = WindowId::compose(kind, session_label, index);
        if !is_taken(&id) {
            return id;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn unscoped_ids_start_at_zero() {
        let id = allocate("settings", None, |_| false);
        assert_eq!(id, "w_settings_0");
    }

    #[test]
    fn scoped_ids_skip_taken_suffixes() {
        let taken: BTreeSet<WindowId> = [
            WindowId::compose("T", Some("L"), 0),
            WindowId::compose("T", Some("L"), 1),
        ]
        .into_iter()
        .collect();
        let id = allocate("T", Some("L"), |id| taken.contains(id));
        assert_eq!(id, "w_L_T_2");
    }

    #[test]
    fn gaps_are_refilled_lowest_first() {
        let taken: BTreeSet<WindowId> = [
            WindowId::compose("code", None, 0),
            WindowId::compose("code", None, 2),
        ]
        .into_iter()
        .collect();
        assert_eq!(allocate("code", None, |id| taken.contains(id)), "w_code_1");
    }
}
