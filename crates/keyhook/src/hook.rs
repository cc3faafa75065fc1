//! Low-level keyboard interception adapter.
//!
//! [`KeyboardHook`] owns the process-wide keyboard hook, tracks modifier
//! state across raw key transitions, and fires a registered callback when a
//! bound combination is pressed. The OS dispatch mechanism has no instance
//! context, so at most one `KeyboardHook` may be live per process;
//! construction fails hard if that is violated.
//!
//! The adapter is intentionally unsynchronized. Its methods must not race
//! with each other or with event delivery from another thread; the
//! [`HotkeyManager`](crate::manager::HotkeyManager) facade provides that
//! serialization.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::key::{Combination, ModifierState, Modifiers};
use crate::platform;

/// Callback invoked when a registered combination is pressed. Receives the
/// virtual key code and the modifier mask that was held at press time.
pub type HookCallback = Box<dyn Fn(u32, Modifiers) + Send>;

/// One raw keyboard transition as seen by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Virtual key code
    pub vk: u32,
    /// True for a press (including system key-down), false for a release
    pub down: bool,
}

impl KeyEvent {
    /// A key-press transition
    pub fn key_down(vk: u32) -> Self {
        KeyEvent { vk, down: true }
    }

    /// A key-release transition
    pub fn key_up(vk: u32) -> Self {
        KeyEvent { vk, down: false }
    }
}

/// Set while a `KeyboardHook` instance is alive anywhere in the process.
/// The OS hook procedure resolves to "the" instance through the platform
/// layer, so two live hooks can never be allowed.
static HOOK_LIVE: AtomicBool = AtomicBool::new(false);

/// Modifier state plus the binding table, heap-allocated behind
/// [`KeyboardHook`] so the address the OS callback dereferences stays
/// stable even when the owning hook value moves.
pub(crate) struct EventSink {
    state: ModifierState,
    callbacks: HashMap<u64, HookCallback>,
}

impl EventSink {
    /// Apply one raw keyboard event: update modifier state, then on a
    /// press of a non-modifier key look up the current combination and
    /// invoke its callback.
    pub(crate) fn handle(&mut self, event: KeyEvent) {
        self.state.apply(event.vk, event.down);

        if !event.down || ModifierState::is_modifier(event.vk) {
            return;
        }

        let mask = self.state.mask();
        let id = Combination::new(event.vk, mask).id();
        if let Some(callback) = self.callbacks.get(&id) {
            // A panicking action must never cross into the OS dispatch
            // chain; contain it here and leave a trace for the operator.
            if catch_unwind(AssertUnwindSafe(|| callback(event.vk, mask))).is_err() {
                warn!(vk = event.vk, %mask, "hotkey action panicked, discarded");
            }
        }
    }
}

/// Sole owner of the OS-level global keyboard interception resource.
pub struct KeyboardHook {
    handle: Option<platform::HookHandle>,
    last_error: Option<u32>,
    sink: Box<EventSink>,
}

impl KeyboardHook {
    /// Creates the adapter without installing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HookAlreadyLive`] if another `KeyboardHook` exists
    /// in this process.
    pub fn new() -> Result<Self> {
        if HOOK_LIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::HookAlreadyLive);
        }

        Ok(KeyboardHook {
            handle: None,
            last_error: None,
            sink: Box::new(EventSink {
                state: ModifierState::default(),
                callbacks: HashMap::new(),
            }),
        })
    }

    /// Install the system hook. Idempotent; returns true if already
    /// installed.
    ///
    /// Must be called from a thread that pumps a message loop; events are
    /// only delivered while that loop runs, and the adapter cannot detect a
    /// loop-less host. On OS refusal this returns false, stays uninstalled,
    /// and the error code is available via [`last_os_error`](Self::last_os_error).
    ///
    /// The platform layer keeps a pointer to hook state that lives on the
    /// heap behind this value, so the adapter itself may move freely while
    /// installed.
    pub fn install(&mut self) -> bool {
        if self.handle.is_some() {
            return true;
        }

        match platform::install(self.sink.as_mut()) {
            Ok(handle) => {
                self.handle = Some(handle);
                debug!("keyboard hook installed");
                true
            }
            Err(code) => {
                warn!(code, "keyboard hook installation failed");
                self.last_error = Some(code);
                false
            }
        }
    }

    /// Remove the hook and reset all modifier flags. Idempotent.
    pub fn uninstall(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };

        let ok = handle.remove();
        self.sink.state.clear();
        debug!("keyboard hook removed");
        ok
    }

    /// Whether the hook is currently installed
    pub fn is_installed(&self) -> bool {
        self.handle.is_some()
    }

    /// OS error code from the most recent failed install, for diagnostics
    pub fn last_os_error(&self) -> Option<u32> {
        self.last_error
    }

    /// Insert or replace the callback bound to (vk, modifiers)
    pub fn register_hotkey(&mut self, vk: u32, modifiers: Modifiers, callback: HookCallback) {
        let id = Combination::new(vk, modifiers).id();
        self.sink.callbacks.insert(id, callback);
    }

    /// Remove the binding for (vk, modifiers) if present
    pub fn unregister_hotkey(&mut self, vk: u32, modifiers: Modifiers) {
        let id = Combination::new(vk, modifiers).id();
        self.sink.callbacks.remove(&id);
    }

    /// Empty the binding table
    pub fn clear_all_hotkeys(&mut self) {
        self.sink.callbacks.clear();
    }

    /// Handle one raw keyboard event.
    ///
    /// On Windows the installed hook procedure drives this synchronously on
    /// the message-loop thread; hosts on other platforms (and tests) may
    /// drive it directly. Updates modifier state, then on a press of a
    /// non-modifier key looks up the current combination and invokes its
    /// callback. The surrounding hook procedure always forwards the event to
    /// the next observer in the chain, handled or not.
    pub fn process_event(&mut self, event: KeyEvent) {
        self.sink.handle(event);
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
        HOOK_LIVE.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::key::vk;
    use crate::test_lock;

    #[test]
    fn single_instance_per_process() {
        let _slot = test_lock::hold();
        let first = KeyboardHook::new().unwrap();
        assert!(matches!(KeyboardHook::new(), Err(Error::HookAlreadyLive)));
        drop(first);
        // The slot frees once the live hook is gone.
        assert!(KeyboardHook::new().is_ok());
    }

    #[test]
    fn install_and_uninstall_are_idempotent() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();
        assert!(!hook.is_installed());
        assert!(hook.install());
        assert!(hook.install());
        assert!(hook.is_installed());
        assert!(hook.uninstall());
        assert!(hook.uninstall());
        assert!(!hook.is_installed());
    }

    #[test]
    fn modifier_state_follows_variants() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();

        hook.process_event(KeyEvent::key_down(vk::LCONTROL));
        assert!(hook.sink.state.ctrl);
        hook.process_event(KeyEvent::key_down(vk::RCONTROL));
        assert!(hook.sink.state.ctrl);
        // Boolean-per-group semantics: either variant's release clears the
        // flag, even with the other still held.
        hook.process_event(KeyEvent::key_up(vk::RCONTROL));
        assert!(!hook.sink.state.ctrl);
        hook.process_event(KeyEvent::key_up(vk::LCONTROL));
        assert!(!hook.sink.state.ctrl);
    }

    #[test]
    fn uninstall_resets_modifier_state() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();
        assert!(hook.install());
        hook.process_event(KeyEvent::key_down(vk::LSHIFT));
        assert!(hook.sink.state.shift);
        assert!(hook.uninstall());
        assert_eq!(hook.sink.state, ModifierState::default());
    }

    #[test]
    fn fires_on_matching_combination_exactly_once() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();

        let seen: Arc<Mutex<Vec<(u32, Modifiers)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        hook.register_hotkey(
            b'N' as u32,
            Modifiers::WIN | Modifiers::CTRL,
            Box::new(move |vk, mods| seen_cb.lock().unwrap().push((vk, mods))),
        );

        hook.process_event(KeyEvent::key_down(vk::LWIN));
        hook.process_event(KeyEvent::key_down(vk::LCONTROL));
        hook.process_event(KeyEvent::key_down(b'N' as u32));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(b'N' as u32, Modifiers::WIN | Modifiers::CTRL)]
        );

        // The release must not re-fire.
        hook.process_event(KeyEvent::key_up(b'N' as u32));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn no_fire_without_matching_modifiers() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        hook.register_hotkey(
            vk::F1,
            Modifiers::WIN,
            Box::new(move |_, _| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // Bare F1, then Ctrl+F1: neither matches Win+F1.
        hook.process_event(KeyEvent::key_down(vk::F1));
        hook.process_event(KeyEvent::key_up(vk::F1));
        hook.process_event(KeyEvent::key_down(vk::LCONTROL));
        hook.process_event(KeyEvent::key_down(vk::F1));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // A modifier press alone never fires either.
        hook.process_event(KeyEvent::key_down(vk::LWIN));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregister_and_clear_remove_bindings() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let f1 = fired.clone();
        let f2 = fired.clone();
        hook.register_hotkey(
            vk::F1,
            Modifiers::WIN,
            Box::new(move |_, _| {
                f1.fetch_add(1, Ordering::SeqCst);
            }),
        );
        hook.register_hotkey(
            vk::F2,
            Modifiers::WIN,
            Box::new(move |_, _| {
                f2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        hook.unregister_hotkey(vk::F1, Modifiers::WIN);
        // Unregistering an absent binding is a no-op.
        hook.unregister_hotkey(vk::F1, Modifiers::WIN);

        hook.process_event(KeyEvent::key_down(vk::LWIN));
        hook.process_event(KeyEvent::key_down(vk::F1));
        hook.process_event(KeyEvent::key_down(vk::F2));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        hook.clear_all_hotkeys();
        hook.process_event(KeyEvent::key_down(vk::F2));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bindings_survive_moving_an_installed_hook() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();
        assert!(hook.install());

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        hook.register_hotkey(
            vk::F1,
            Modifiers::WIN,
            Box::new(move |_, _| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // The dispatch target lives behind the hook on the heap, so the
        // hook value itself may move while installed.
        let mut moved = Box::new(hook);
        moved.process_event(KeyEvent::key_down(vk::LWIN));
        moved.process_event(KeyEvent::key_down(vk::F1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(moved.uninstall());
    }

    #[test]
    fn panicking_action_is_contained() {
        let _slot = test_lock::hold();
        let mut hook = KeyboardHook::new().unwrap();

        hook.register_hotkey(
            vk::F1,
            Modifiers::empty(),
            Box::new(|_, _| panic!("misbehaving action")),
        );
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        hook.register_hotkey(
            vk::F2,
            Modifiers::empty(),
            Box::new(move |_, _| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // Must not unwind out of the handler, and must leave the table and
        // state intact for later events.
        hook.process_event(KeyEvent::key_down(vk::F1));
        hook.process_event(KeyEvent::key_up(vk::F1));
        hook.process_event(KeyEvent::key_down(vk::F2));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
