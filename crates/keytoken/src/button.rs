use std::fmt;

use serde::{Deserialize, Serialize};

/// A mouse button that can be captured, bound or clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// First side button ("back").
    X1,
    /// Second side button ("forward").
    X2,
}

impl MouseButton {
    /// All buttons, in display order.
    pub const ALL: [Self; 5] = [Self::Left, Self::Right, Self::Middle, Self::X1, Self::X2];

    /// Canonical lowercase name used in tokens and settings files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::X1 => "x1",
            Self::X2 => "x2",
        }
    }

    /// Resolve a button from its canonical name or a vendor alias.
    ///
    /// Side buttons show up under several names depending on the platform
    /// (`button8`, `x_button1`, `xbutton1`, `back`); all of them map to
    /// [`MouseButton::X1`], and likewise for [`MouseButton::X2`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "middle" => Some(Self::Middle),
            "x1" | "button8" | "x_button1" | "xbutton1" | "back" => Some(Self::X1),
            "x2" | "button9" | "x_button2" | "xbutton2" | "forward" => Some(Self::X2),
            _ => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for b in MouseButton::ALL {
            assert_eq!(MouseButton::from_name(b.name()), Some(b));
        }
    }

    #[test]
    fn vendor_aliases() {
        assert_eq!(MouseButton::from_name("Button8"), Some(MouseButton::X1));
        assert_eq!(MouseButton::from_name("x_button2"), Some(MouseButton::X2));
        assert_eq!(MouseButton::from_name("xbutton1"), Some(MouseButton::X1));
        assert_eq!(MouseButton::from_name("button10"), None);
    }
}
