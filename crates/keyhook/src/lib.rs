//! A global hotkey engine built on a low-level keyboard hook.
//!
//! Two layers: [`KeyboardHook`] owns the single system-wide keyboard
//! interception handle and tracks merged left/right modifier state, while
//! [`HotkeyManager`] is the thread-safe registry that maps combinations to
//! actions, rejects conflicts, and manages the hook's lifecycle. Observed
//! events are always forwarded to the rest of the OS dispatch chain: the
//! engine listens, it never swallows input.
//!
//! The hook only receives events while the thread that started the manager
//! pumps a message loop; the host supplies that loop.
//!
//! ```no_run
//! use keyhook::{key::vk, Combination, HotkeyAction, HotkeyManager, Modifiers};
//!
//! let manager = HotkeyManager::new();
//! manager.start().unwrap();
//! manager.register_hotkey(HotkeyAction::new(
//!     Combination::new(vk::F1, Modifiers::WIN),
//!     "Show help",
//!     || println!("help!"),
//! ));
//! ```

pub mod error;
pub mod hook;
pub mod key;
pub mod manager;
mod platform;

pub use error::{Error, Result};
pub use hook::{HookCallback, KeyEvent, KeyboardHook};
pub use key::{key_name, Combination, ModifierState, Modifiers};
pub use manager::{ActionFn, HotkeyAction, HotkeyManager};
