use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    SessionPicker,
    ReloadSession,
    OpenSettings,
    FocusNext,
    // Menu, dialog or prompt
    CloseOverlay,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Quit => "Quit",
            Action::SessionPicker => "Sessions",
            Action::ReloadSession => "Reload",
            Action::OpenSettings => "Settings",
            Action::FocusNext => "Next window",
            Action::CloseOverlay => "Close",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyCombo {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        key.code == self.code && key.modifiers == self.mods
    }

    /// Footer form: `s`, `Tab`, `Ctrl+Q`.
    pub fn display(&self) -> String {
        let key = match self.code {
            KeyCode::Char(c) if self.mods.contains(KeyModifiers::CONTROL) => {
                c.to_ascii_uppercase().to_string()
            }
            KeyCode::Char(c) => c.to_string(),
            KeyCode::BackTab => "Shift+Tab".to_string(),
            other => other.to_string(),
        };
        if self.mods.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{key}")
        } else {
            key
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<Action, Vec<KeyCombo>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, action: Action, combo: KeyCombo) {
        self.map.entry(action).or_default().push(combo);
    }

    pub fn matches(&self, action: Action, key: &KeyEvent) -> bool {
        self.map
            .get(&action)
            .is_some_and(|list| list.iter().any(|c| c.matches(key)))
    }

    pub fn action_for_key(&self, key: &KeyEvent) -> Option<Action> {
        self.map
            .iter()
            .find(|(_, list)| list.iter().any(|c| c.matches(key)))
            .map(|(action, _)| *action)
    }

    /// Return the display strings for all combos mapped to `action`.
    pub fn combos_for(&self, action: Action) -> Vec<String> {
        self.map
            .get(&action)
            .map(|list| list.iter().map(|c| c.display()).collect())
            .unwrap_or_default()
    }

    /// One-line key hint for the footer, in a fixed order.
    pub fn hint(&self) -> String {
        [
            Action::SessionPicker,
            Action::ReloadSession,
            Action::OpenSettings,
            Action::FocusNext,
            Action::Quit,
        ]
        .into_iter()
        .filter_map(|action| {
            let combos = self.combos_for(action);
            (!combos.is_empty()).then(|| format!("{} {}", combos.join("/"), action))
        })
        .collect::<Vec<_>>()
        .join("  ")
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Action::*;
        let mut kb = Self::new();
        kb.add(
            Quit,
            KeyCombo::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        kb.add(SessionPicker, KeyCombo::plain(KeyCode::Char('s')));
        kb.add(ReloadSession, KeyCombo::plain(KeyCode::Char('r')));
        kb.add(OpenSettings, KeyCombo::plain(KeyCode::Char(',')));
        kb.add(FocusNext, KeyCombo::plain(KeyCode::Tab));
        kb.add(CloseOverlay, KeyCombo::plain(KeyCode::Esc));
        kb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_quit() {
        let kb = KeyBindings::default();
        let ev = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(kb.matches(Action::Quit, &ev));
        assert!(!kb.matches(Action::Quit, &KeyEvent::from(KeyCode::Char('q'))));
    }

    #[test]
    fn plain_keys_resolve_to_actions() {
        let kb = KeyBindings::default();
        let lookup = |code| kb.action_for_key(&KeyEvent::new(code, KeyModifiers::NONE));
        assert_eq!(lookup(KeyCode::Char('s')), Some(Action::SessionPicker));
        assert_eq!(lookup(KeyCode::Char(',')), Some(Action::OpenSettings));
        assert_eq!(lookup(KeyCode::Tab), Some(Action::FocusNext));
        assert_eq!(lookup(KeyCode::Char('x')), None);
    }

    #[test]
    fn hint_lists_bindings_in_order() {
        let hint = KeyBindings::default().hint();
        assert!(hint.starts_with("s Sessions"));
        assert!(hint.ends_with("Ctrl+Q Quit"));
    }
}
