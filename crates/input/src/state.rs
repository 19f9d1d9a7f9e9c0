use std::collections::HashMap;

/// Pressed/released state per logical input code.
///
/// Codes are opaque strings supplied by the host (`"KeyW"`, `"ArrowUp"`,
/// `"forward"`, ...). Handlers overwrite the stored value, so a press and a
/// release arriving before the next tick leave the code released.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashMap<String, bool>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `code` as held.
    pub fn on_key_down(&mut self, code: &str) {
        self.set(code, true);
    }

    /// Mark `code` as released.
    pub fn on_key_up(&mut self, code: &str) {
        self.set(code, false);
    }

    fn set(&mut self, code: &str, pressed: bool) {
        match self.keys.get_mut(code) {
            Some(state) => *state = pressed,
            None => {
                self.keys.insert(code.to_owned(), pressed);
            }
        }
    }

    /// Unknown codes are not pressed.
    pub fn is_pressed(&self, code: &str) -> bool {
        self.keys.get(code).copied().unwrap_or(false)
    }

    /// Codes currently held, sorted for stable output.
    pub fn pressed(&self) -> Vec<&str> {
        let mut held: Vec<&str> = self
            .keys
            .iter()
            .filter(|(_, pressed)| **pressed)
            .map(|(code, _)| code.as_str())
            .collect();
        held.sort_unstable();
        held
    }

    pub fn any_pressed(&self) -> bool {
        self.keys.values().any(|pressed| *pressed)
    }

    /// Release everything, e.g. when the host window loses focus.
    pub fn release_all(&mut self) {
        for pressed in self.keys.values_mut() {
            *pressed = false;
        }
    }
}
