use crate::error::{Error, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Virtual key codes used by the engine.
///
/// Values follow the Win32 virtual-key table so that combinations built on
/// any platform mean the same thing once they reach the Windows hook.
/// Letters and digits use their ASCII uppercase values (`b'A' as u32`).
pub mod vk {
    pub const BACK: u32 = 0x08;
    pub const TAB: u32 = 0x09;
    pub const RETURN: u32 = 0x0D;
    /// Generic Shift (left/right variants below)
    pub const SHIFT: u32 = 0x10;
    /// Generic Ctrl
    pub const CONTROL: u32 = 0x11;
    /// Generic Alt
    pub const MENU: u32 = 0x12;
    pub const PAUSE: u32 = 0x13;
    pub const CAPITAL: u32 = 0x14;
    pub const ESCAPE: u32 = 0x1B;
    pub const SPACE: u32 = 0x20;
    /// Page Up
    pub const PRIOR: u32 = 0x21;
    /// Page Down
    pub const NEXT: u32 = 0x22;
    pub const END: u32 = 0x23;
    pub const HOME: u32 = 0x24;
    pub const LEFT: u32 = 0x25;
    pub const UP: u32 = 0x26;
    pub const RIGHT: u32 = 0x27;
    pub const DOWN: u32 = 0x28;
    /// Print Screen
    pub const SNAPSHOT: u32 = 0x2C;
    pub const INSERT: u32 = 0x2D;
    pub const DELETE: u32 = 0x2E;
    pub const LWIN: u32 = 0x5B;
    pub const RWIN: u32 = 0x5C;
    pub const NUMPAD0: u32 = 0x60;
    pub const NUMPAD9: u32 = 0x69;
    pub const MULTIPLY: u32 = 0x6A;
    pub const ADD: u32 = 0x6B;
    pub const SUBTRACT: u32 = 0x6D;
    pub const DECIMAL: u32 = 0x6E;
    pub const DIVIDE: u32 = 0x6F;
    pub const F1: u32 = 0x70;
    pub const F2: u32 = 0x71;
    pub const F3: u32 = 0x72;
    pub const F4: u32 = 0x73;
    pub const F5: u32 = 0x74;
    pub const F6: u32 = 0x75;
    pub const F7: u32 = 0x76;
    pub const F8: u32 = 0x77;
    pub const F9: u32 = 0x78;
    pub const F10: u32 = 0x79;
    pub const F11: u32 = 0x7A;
    pub const F12: u32 = 0x7B;
    pub const NUMLOCK: u32 = 0x90;
    pub const SCROLL: u32 = 0x91;
    pub const LSHIFT: u32 = 0xA0;
    pub const RSHIFT: u32 = 0xA1;
    pub const LCONTROL: u32 = 0xA2;
    pub const RCONTROL: u32 = 0xA3;
    pub const LMENU: u32 = 0xA4;
    pub const RMENU: u32 = 0xA5;
}

bitflags! {
    /// Modifier flags for a hotkey combination.
    ///
    /// The values match the Windows `RegisterHotKey` modifier conventions so
    /// hosts can pass masks straight through from platform APIs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Modifiers: u32 {
        const WIN = 0x0001;
        const CTRL = 0x0002;
        const SHIFT = 0x0004;
        const ALT = 0x0008;
    }
}

impl fmt::Display for Modifiers {
    /// Renders the fixed order Win, Ctrl, Shift, Alt joined by `+`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Modifiers::WIN) {
            parts.push("Win");
        }
        if self.contains(Modifiers::CTRL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Tracks which modifier groups are currently held.
///
/// Each group merges its left/right/generic virtual keys into one boolean
/// that follows the most recent transition of any variant. This is
/// deliberately not press-counting: releasing right-Ctrl clears the flag
/// even if left-Ctrl is still physically down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Windows key is held
    pub win: bool,
    /// Control key is held
    pub ctrl: bool,
    /// Shift key is held
    pub shift: bool,
    /// Alt key is held
    pub alt: bool,
}

impl ModifierState {
    /// Apply one key transition to the state. Non-modifier keys are ignored.
    pub fn apply(&mut self, vk_code: u32, down: bool) {
        match vk_code {
            vk::LWIN | vk::RWIN => self.win = down,
            vk::CONTROL | vk::LCONTROL | vk::RCONTROL => self.ctrl = down,
            vk::SHIFT | vk::LSHIFT | vk::RSHIFT => self.shift = down,
            vk::MENU | vk::LMENU | vk::RMENU => self.alt = down,
            _ => {}
        }
    }

    /// Whether a virtual key belongs to one of the four modifier groups.
    pub fn is_modifier(vk_code: u32) -> bool {
        matches!(
            vk_code,
            vk::LWIN
                | vk::RWIN
                | vk::CONTROL
                | vk::LCONTROL
                | vk::RCONTROL
                | vk::SHIFT
                | vk::LSHIFT
                | vk::RSHIFT
                | vk::MENU
                | vk::LMENU
                | vk::RMENU
        )
    }

    /// Current state as a modifier mask.
    pub fn mask(&self) -> Modifiers {
        let mut mods = Modifiers::empty();
        if self.win {
            mods |= Modifiers::WIN;
        }
        if self.ctrl {
            mods |= Modifiers::CTRL;
        }
        if self.shift {
            mods |= Modifiers::SHIFT;
        }
        if self.alt {
            mods |= Modifiers::ALT;
        }
        mods
    }

    /// Release every group.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A (key, modifier-set) pair identifying a specific hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combination {
    /// Virtual key code of the non-modifier key
    pub key: u32,
    /// Modifier mask that must be held
    pub modifiers: Modifiers,
}

impl Combination {
    /// Create a new Combination from a key code and modifier mask
    pub fn new(key: u32, modifiers: Modifiers) -> Self {
        Combination { key, modifiers }
    }

    /// Identity value used for table storage and conflict detection:
    /// modifier bits in the high 32 bits, key code in the low 32. Injective
    /// over the (key, modifiers) domain.
    pub fn id(&self) -> u64 {
        (u64::from(self.modifiers.bits()) << 32) | u64::from(self.key)
    }

    /// Parse a combination from a string representation
    ///
    /// Supports formats like:
    /// - "f1" (just a key)
    /// - "ctrl+n" (with a modifier)
    /// - "win+ctrl+n" (multiple modifiers)
    /// - "super+shift+enter" (alternative modifier names)
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).collect();

        // The last part is the key code, everything before it a modifier.
        // SAFETY: split always yields at least one part
        let key_part = parts.last().unwrap();
        let modifier_parts = &parts[..parts.len() - 1];

        let key = parse_key_code(key_part)?;

        let mut modifiers = Modifiers::empty();
        for part in modifier_parts {
            match part.to_ascii_lowercase().as_str() {
                "win" | "windows" | "super" | "cmd" | "meta" => modifiers |= Modifiers::WIN,
                "ctrl" | "control" => modifiers |= Modifiers::CTRL,
                "shift" => modifiers |= Modifiers::SHIFT,
                "alt" | "option" => modifiers |= Modifiers::ALT,
                _ => return Err(Error::InvalidKey(format!("Unknown modifier: {part}"))),
            }
        }

        Ok(Combination { key, modifiers })
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", key_name(self.key))
        } else {
            write!(f, "{}+{}", self.modifiers, key_name(self.key))
        }
    }
}

impl FromStr for Combination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Combination::parse(s)
    }
}

/// Human-readable name for a virtual key code (e.g. "A", "F1", "Enter").
///
/// Keys without a display name fall back to `VK_<code>`.
pub fn key_name(vk_code: u32) -> String {
    let name = match vk_code {
        vk::BACK => "Backspace",
        vk::TAB => "Tab",
        vk::RETURN => "Enter",
        vk::PAUSE => "Pause",
        vk::CAPITAL => "Caps Lock",
        vk::ESCAPE => "Esc",
        vk::SPACE => "Space",
        vk::PRIOR => "Page Up",
        vk::NEXT => "Page Down",
        vk::END => "End",
        vk::HOME => "Home",
        vk::LEFT => "Left",
        vk::UP => "Up",
        vk::RIGHT => "Right",
        vk::DOWN => "Down",
        vk::SNAPSHOT => "Print Screen",
        vk::INSERT => "Insert",
        vk::DELETE => "Delete",
        vk::MULTIPLY => "Numpad *",
        vk::ADD => "Numpad +",
        vk::SUBTRACT => "Numpad -",
        vk::DECIMAL => "Numpad .",
        vk::DIVIDE => "Numpad /",
        vk::NUMLOCK => "Num Lock",
        vk::SCROLL => "Scroll Lock",
        vk::NUMPAD0..=vk::NUMPAD9 => return format!("Numpad {}", vk_code - vk::NUMPAD0),
        vk::F1..=vk::F12 => return format!("F{}", vk_code - vk::F1 + 1),
        0x30..=0x39 | 0x41..=0x5A => return char::from(vk_code as u8).to_string(),
        _ => return format!("VK_{vk_code}"),
    };
    name.to_string()
}

/// Parse a key-code name, the inverse of [`key_name`] for common keys
fn parse_key_code(s: &str) -> Result<u32> {
    let lower = s.to_ascii_lowercase();

    // Single letters and digits map straight to their VK value
    if lower.len() == 1 {
        let c = lower.as_bytes()[0];
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            return Ok(u32::from(c.to_ascii_uppercase()));
        }
    }

    // Function keys
    if let Some(num) = lower.strip_prefix('f') {
        if let Ok(n) = num.parse::<u32>() {
            if (1..=12).contains(&n) {
                return Ok(vk::F1 + n - 1);
            }
        }
    }

    match lower.as_str() {
        "enter" | "return" => Ok(vk::RETURN),
        "space" => Ok(vk::SPACE),
        "escape" | "esc" => Ok(vk::ESCAPE),
        "tab" => Ok(vk::TAB),
        "backspace" => Ok(vk::BACK),
        "delete" | "del" => Ok(vk::DELETE),
        "insert" | "ins" => Ok(vk::INSERT),
        "home" => Ok(vk::HOME),
        "end" => Ok(vk::END),
        "pageup" | "page up" | "pgup" => Ok(vk::PRIOR),
        "pagedown" | "page down" | "pgdn" => Ok(vk::NEXT),
        "left" => Ok(vk::LEFT),
        "right" => Ok(vk::RIGHT),
        "up" => Ok(vk::UP),
        "down" => Ok(vk::DOWN),
        "" => Err(Error::InvalidKey("Empty key string".to_string())),
        _ => Err(Error::InvalidKey(format!("Unknown key code: {s}"))),
    }
}
