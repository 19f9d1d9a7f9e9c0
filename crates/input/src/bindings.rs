use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::state::InputState;

/// Horizontal movement direction along a world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 4] = [Self::Forward, Self::Backward, Self::Left, Self::Right];

    /// Unit world axis. Forward looks down -Z, right is +X.
    pub fn axis(self) -> Vec3 {
        match self {
            Self::Forward => Vec3::NEG_Z,
            Self::Backward => Vec3::Z,
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
        }
    }
}

/// One input code driving one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub code: String,
    pub direction: MoveDirection,
}

impl KeyBinding {
    pub fn new(code: impl Into<String>, direction: MoveDirection) -> Self {
        Self {
            code: code.into(),
            direction,
        }
    }
}

/// Maps input codes to movement directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings {
    bindings: Vec<KeyBinding>,
}

impl Default for KeyBindings {
    /// Logical names, WASD and the arrow keys.
    fn default() -> Self {
        use MoveDirection::*;
        let table = [
            ("forward", Forward),
            ("backward", Backward),
            ("left", Left),
            ("right", Right),
            ("KeyW", Forward),
            ("KeyS", Backward),
            ("KeyA", Left),
            ("KeyD", Right),
            ("ArrowUp", Forward),
            ("ArrowDown", Backward),
            ("ArrowLeft", Left),
            ("ArrowRight", Right),
        ];
        Self {
            bindings: table
                .into_iter()
                .map(|(code, dir)| KeyBinding::new(code, dir))
                .collect(),
        }
    }
}

impl KeyBindings {
    /// Bindings with no keys at all.
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Add a key for `direction`. Existing keys stay bound.
    pub fn bind(&mut self, code: impl Into<String>, direction: MoveDirection) {
        self.bindings.push(KeyBinding::new(code, direction));
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// True if any code bound to `direction` is held.
    pub fn is_active(&self, input: &InputState, direction: MoveDirection) -> bool {
        self.bindings
            .iter()
            .any(|b| b.direction == direction && input.is_pressed(&b.code))
    }

    /// Sum of the unit axes of every active direction.
    ///
    /// Directions compose (forward + left is diagonal, forward + backward
    /// cancels); several codes for the same direction count once.
    pub fn movement_axis(&self, input: &InputState) -> Vec3 {
        MoveDirection::ALL
            .into_iter()
            .filter(|d| self.is_active(input, *d))
            .map(MoveDirection::axis)
            .sum()
    }
}
