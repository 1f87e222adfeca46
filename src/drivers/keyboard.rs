use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

/// Folds the platform differences out of raw key events before they reach
/// the key bindings: presses only, `Ctrl+Shift+q` reads as `Ctrl+q`, and
/// Shift+Tab as BackTab.
#[derive(Debug, Default)]
pub struct KeyboardNormalizer {
    esc_down: bool,
}

impl KeyboardNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, evt: Event) -> Option<Event> {
        let Event::Key(mut key) = evt else {
            return Some(evt);
        };
        match key.kind {
            KeyEventKind::Press => {}
            KeyEventKind::Release => {
                if key.code == KeyCode::Esc {
                    self.esc_down = false;
                }
                return None;
            }
            KeyEventKind::Repeat => return None,
        }
        // Some terminals report a held Esc as repeated presses.
        if key.code == KeyCode::Esc {
            if self.esc_down && cfg!(windows) {
                return None;
            }
            self.esc_down = true;
        } else {
            self.esc_down = false;
        }
        if key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT) {
            key.code = KeyCode::BackTab;
            key.modifiers.remove(KeyModifiers::SHIFT);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char(c) = key.code
        {
            key.code = KeyCode::Char(c.to_ascii_lowercase());
            key.modifiers.remove(KeyModifiers::SHIFT);
        }
        Some(Event::Key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn press(code: KeyCode, mods: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, mods))
    }

    #[test]
    fn shift_tab_becomes_backtab() {
        let out = KeyboardNormalizer::new().normalize(press(KeyCode::Tab, KeyModifiers::SHIFT));
        let Some(Event::Key(key)) = out else {
            panic!("expected key event");
        };
        assert_eq!(key.code, KeyCode::BackTab);
        assert!(key.modifiers.is_empty());
    }

    #[test]
    fn control_letters_are_lowercased() {
        let out = KeyboardNormalizer::new().normalize(press(
            KeyCode::Char('Q'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        ));
        let Some(Event::Key(key)) = out else {
            panic!("expected key event");
        };
        assert_eq!(key.code, KeyCode::Char('q'));
        assert_eq!(key.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn releases_are_dropped() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(KeyboardNormalizer::new().normalize(Event::Key(key)).is_none());
    }

    #[test]
    fn non_key_events_pass_through() {
        let out = KeyboardNormalizer::new().normalize(Event::Resize(10, 20));
        assert_eq!(out, Some(Event::Resize(10, 20)));
    }
}
