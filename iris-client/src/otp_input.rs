//! Six-slot authenticator code entry
//!
//! Each slot holds at most one digit. Typing advances the cursor, backspace
//! on an empty slot clears the previous one, and pasting fills from the
//! cursor onward.

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    slots: [Option<char>; OTP_LENGTH],
    cursor: usize,
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot with the input focus
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn focus(&mut self, index: usize) {
        self.cursor = index.min(OTP_LENGTH - 1);
    }

    /// Set one slot from a change event; non-digits are ignored, an empty
    /// value clears the slot. Returns whether the slot changed.
    pub fn set(&mut self, index: usize, value: &str) -> bool {
        if index >= OTP_LENGTH {
            return false;
        }
        let value = value.trim();
        if value.is_empty() {
            let changed = self.slots[index].is_some();
            self.slots[index] = None;
            self.cursor = index;
            return changed;
        }
        // Keep the last digit typed into an already-filled slot
        match value.chars().rev().find(char::is_ascii_digit) {
            Some(digit) => {
                self.slots[index] = Some(digit);
                self.cursor = (index + 1).min(OTP_LENGTH - 1);
                true
            }
            None => false,
        }
    }

    /// Type a digit at the cursor
    pub fn type_char(&mut self, c: char) -> bool {
        self.set(self.cursor, &c.to_string())
    }

    /// Backspace at the cursor; an empty slot moves back and clears the previous one
    pub fn backspace(&mut self) {
        if self.slots[self.cursor].is_some() {
            self.slots[self.cursor] = None;
        } else if self.cursor > 0 {
            self.cursor -= 1;
            self.slots[self.cursor] = None;
        }
    }

    /// Paste from the cursor; non-digits are skipped, overflow is dropped.
    /// Returns the number of digits placed.
    pub fn paste(&mut self, text: &str) -> usize {
        let mut placed = 0;
        let mut index = self.cursor;
        for digit in text.chars().filter(char::is_ascii_digit) {
            if index >= OTP_LENGTH {
                break;
            }
            self.slots[index] = Some(digit);
            index += 1;
            placed += 1;
        }
        self.cursor = index.min(OTP_LENGTH - 1);
        placed
    }

    /// Digits entered so far, in slot order
    pub fn code(&self) -> String {
        self.slots.iter().flatten().collect()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Submission is allowed exactly when all six slots hold a digit
    pub fn can_submit(&self) -> bool {
        self.filled() == OTP_LENGTH
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_enabled_exactly_at_six_digits() {
        let mut input = OtpInput::new();
        for (i, c) in "12345".chars().enumerate() {
            input.type_char(c);
            assert_eq!(input.filled(), i + 1);
            assert!(!input.can_submit());
        }
        input.type_char('6');
        assert!(input.can_submit());
        assert_eq!(input.code(), "123456");
    }

    #[test]
    fn test_non_digits_are_ignored() {
        let mut input = OtpInput::new();
        assert!(!input.type_char('a'));
        assert_eq!(input.filled(), 0);
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_backspace_on_empty_slot_clears_previous() {
        let mut input = OtpInput::new();
        input.type_char('1');
        input.type_char('2');
        assert_eq!(input.cursor(), 2);

        input.backspace();
        assert_eq!(input.cursor(), 1);
        assert_eq!(input.code(), "1");

        input.backspace();
        assert_eq!(input.cursor(), 0);
        assert_eq!(input.code(), "");
    }

    #[test]
    fn test_paste_fills_and_truncates() {
        let mut input = OtpInput::new();
        assert_eq!(input.paste("12 34-56789"), 6);
        assert!(input.can_submit());
        assert_eq!(input.code(), "123456");
        assert_eq!(input.cursor(), OTP_LENGTH - 1);
    }

    #[test]
    fn test_clearing_a_slot_disables_submit() {
        let mut input = OtpInput::new();
        input.paste("654321");
        assert!(input.set(2, ""));
        assert!(!input.can_submit());
        assert_eq!(input.code(), "65321");

        input.clear();
        assert_eq!(input, OtpInput::default());
    }
}
