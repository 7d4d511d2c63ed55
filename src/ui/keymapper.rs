//! Key mapping for terminal input
//!
//! Converts key events to the key codes sent in keypress requests. The
//! server feeds the codes of one keystroke to its terminal as input bytes.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u32 = 0x1B;

/// Key mapper for converting key events to key codes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to key codes, `None` if the key sends nothing
    pub fn map(event: &KeyEvent) -> Option<Vec<u32>> {
        match event.code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, event.modifiers)),

            KeyCode::Enter => Some(vec![13]),
            KeyCode::Backspace => Some(vec![0x7F]),
            KeyCode::Tab => Some(vec![0x09]),
            KeyCode::Esc => Some(vec![ESC]),

            // Arrow keys (application mode)
            KeyCode::Up => Some(Self::escape("OA")),
            KeyCode::Down => Some(Self::escape("OB")),
            KeyCode::Right => Some(Self::escape("OC")),
            KeyCode::Left => Some(Self::escape("OD")),

            KeyCode::PageUp => Some(Self::escape("[5~")),
            KeyCode::PageDown => Some(Self::escape("[6~")),
            KeyCode::Delete => Some(Self::escape("[3~")),

            KeyCode::F(n) => Self::function_key(n),

            _ => None,
        }
    }

    /// ESC followed by `rest`
    fn escape(rest: &str) -> Vec<u32> {
        std::iter::once(ESC).chain(rest.chars().map(u32::from)).collect()
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: KeyModifiers) -> Vec<u32> {
        let alt = mods.contains(KeyModifiers::ALT);

        // Ctrl + letter = control character
        if mods.contains(KeyModifiers::CONTROL) {
            let control = if ch.is_ascii_alphabetic() {
                Some(u32::from(ch.to_ascii_uppercase()) - u32::from('A') + 1)
            } else {
                match ch {
                    '@' | '`' | ' ' => Some(0x00),
                    '[' => Some(0x1B),
                    '\\' => Some(0x1C),
                    ']' => Some(0x1D),
                    '^' | '~' => Some(0x1E),
                    '_' | '?' => Some(0x1F),
                    _ => None,
                }
            };
            if let Some(code) = control {
                return if alt { vec![ESC, code] } else { vec![code] };
            }
        }

        // Alt + key = ESC + key
        if alt {
            return vec![ESC, u32::from(ch)];
        }

        vec![u32::from(ch)]
    }

    /// Function key sequence
    fn function_key(n: u8) -> Option<Vec<u32>> {
        let rest = match n {
            1 => "OP",
            2 => "OQ",
            3 => "OR",
            4 => "OS",
            5 => "[15~",
            6 => "[17~",
            7 => "[18~",
            8 => "[19~",
            9 => "[20~",
            10 => "[21~",
            11 => "[23~",
            12 => "[24~",
            _ => return None,
        };
        Some(Self::escape(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    fn codes(s: &str) -> Vec<u32> {
        s.chars().map(u32::from).collect()
    }

    #[test]
    fn test_char_keys() {
        // Normal character
        let event = key_event(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(vec![97]));

        // Ctrl+C
        let event = key_event(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(KeyMapper::map(&event), Some(vec![0x03]));

        // Alt+x
        let event = key_event(KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(KeyMapper::map(&event), Some(vec![0x1B, 120]));

        // Ctrl+Alt+a
        let event = key_event(KeyCode::Char('a'), KeyModifiers::CONTROL | KeyModifiers::ALT);
        assert_eq!(KeyMapper::map(&event), Some(vec![0x1B, 0x01]));

        // Shift is already folded into the character
        let event = key_event(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(KeyMapper::map(&event), Some(vec![65]));

        // Non-ASCII goes through as its code point
        let event = key_event(KeyCode::Char('é'), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(vec![0xE9]));
    }

    #[test]
    fn test_special_keys() {
        let event = key_event(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(vec![13]));

        let event = key_event(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(vec![0x7F]));

        let event = key_event(KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1b[6~")));

        let event = key_event(KeyCode::Home, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), None);
    }

    #[test]
    fn test_arrow_keys() {
        let event = key_event(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1bOA")));

        let event = key_event(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1bOD")));
    }

    #[test]
    fn test_function_keys() {
        let event = key_event(KeyCode::F(1), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1bOP")));

        let event = key_event(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1b[15~")));

        let event = key_event(KeyCode::F(12), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), Some(codes("\x1b[24~")));

        let event = key_event(KeyCode::F(13), KeyModifiers::NONE);
        assert_eq!(KeyMapper::map(&event), None);
    }
}
