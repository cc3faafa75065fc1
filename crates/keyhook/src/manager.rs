//! Thread-safe hotkey registry over one [`KeyboardHook`].
//!
//! The manager is the synchronization boundary: every public operation
//! holds one mutex over the action table and the hook for its full
//! duration, including the calls into the unsynchronized adapter.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hook::KeyboardHook;
use crate::key::{Combination, Modifiers};

/// Type alias for the zero-argument action a hotkey triggers
pub type ActionFn = Arc<dyn Fn() + Send + Sync>;

/// A hotkey combination bound to an action, with a description for UI lists
#[derive(Clone)]
pub struct HotkeyAction {
    /// The combination that triggers the action
    pub combination: Combination,
    /// Human-readable description of what the action does
    pub description: String,
    action: ActionFn,
}

impl HotkeyAction {
    /// Create a new action for the given combination
    pub fn new<F>(combination: Combination, description: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        HotkeyAction {
            combination,
            description: description.into(),
            action: Arc::new(action),
        }
    }
}

impl fmt::Debug for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotkeyAction")
            .field("combination", &self.combination.to_string())
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// State behind the manager's single lock. Running means the hook exists.
struct Inner {
    hook: Option<KeyboardHook>,
    actions: HashMap<u64, HotkeyAction>,
}

/// Lifecycle-managed, thread-safe facade over one keyboard hook, adding
/// conflict detection and an action-oriented API.
///
/// The registry owns the authoritative action table; the adapter's binding
/// table is derived from it and the two are always cleared together.
pub struct HotkeyManager {
    inner: Mutex<Inner>,
}

impl HotkeyManager {
    /// Creates a stopped manager. Nothing touches the OS until
    /// [`start`](Self::start).
    pub fn new() -> Self {
        HotkeyManager {
            inner: Mutex::new(Inner {
                hook: None,
                actions: HashMap::new(),
            }),
        }
    }

    /// Install the keyboard hook and enter the Running state.
    ///
    /// Returns `Ok(true)` on success or if already running, and `Ok(false)`
    /// when the OS refuses the hook (the fresh adapter is discarded and the
    /// manager stays stopped). Must be called from a thread that pumps a
    /// message loop.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::HookAlreadyLive`](crate::Error::HookAlreadyLive)
    /// if some other part of the process already owns a keyboard hook.
    pub fn start(&self) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();

        if inner.hook.is_some() {
            debug!("hotkey manager already running");
            return Ok(true);
        }

        let mut hook = KeyboardHook::new()?;
        if !hook.install() {
            // Dropping the failed hook frees the process-wide slot.
            return Ok(false);
        }

        inner.hook = Some(hook);
        info!("hotkey manager started");
        Ok(true)
    }

    /// Clear every registration and remove the hook. No-op when stopped.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();

        if inner.hook.is_none() {
            return;
        }

        inner.actions.clear();
        // Dropping the hook uninstalls it and frees the singleton slot.
        inner.hook = None;
        info!("hotkey manager stopped");
    }

    /// Whether the hook is installed and registrations are accepted
    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().hook.is_some()
    }

    /// Register a hotkey action.
    ///
    /// Returns false, without mutating anything, when the manager is not
    /// running or the combination is already registered (conflict).
    pub fn register_hotkey(&self, action: HotkeyAction) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let Some(hook) = inner.hook.as_mut() else {
            warn!(hotkey = %action.combination, "registration ignored, manager not running");
            return false;
        };

        let id = action.combination.id();
        if inner.actions.contains_key(&id) {
            warn!(hotkey = %action.combination, "registration rejected, combination already bound");
            return false;
        }

        // The adapter binding forwards to the user action, dropping the raw
        // (vk, modifiers) arguments.
        let user_action = action.action.clone();
        hook.register_hotkey(
            action.combination.key,
            action.combination.modifiers,
            Box::new(move |_, _| user_action()),
        );

        debug!(hotkey = %action.combination, description = %action.description, "hotkey registered");
        inner.actions.insert(id, action);
        true
    }

    /// Remove a registration from both the registry and the adapter.
    /// Returns false if the combination was not registered.
    pub fn unregister_hotkey(&self, vk: u32, modifiers: Modifiers) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let Some(hook) = inner.hook.as_mut() else {
            return false;
        };

        let combination = Combination::new(vk, modifiers);
        if inner.actions.remove(&combination.id()).is_none() {
            return false;
        }

        hook.unregister_hotkey(vk, modifiers);
        debug!(hotkey = %combination, "hotkey unregistered");
        true
    }

    /// Clear both tables. Valid in any lifecycle state.
    pub fn clear_all_hotkeys(&self) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if let Some(hook) = inner.hook.as_mut() {
            hook.clear_all_hotkeys();
        }
        inner.actions.clear();
    }

    /// Whether (vk, modifiers) is already registered
    pub fn is_hotkey_conflict(&self, vk: u32, modifiers: Modifiers) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.actions.contains_key(&Combination::new(vk, modifiers).id())
    }

    /// Snapshot copy of the registered actions, safe to iterate lock-free
    pub fn registered_hotkeys(&self) -> Vec<HotkeyAction> {
        let inner = self.inner.lock().unwrap();
        inner.actions.values().cloned().collect()
    }

    /// Number of registered hotkeys
    pub fn hotkey_count(&self) -> usize {
        self.inner.lock().unwrap().actions.len()
    }

    /// Feed a raw event through the owned adapter
    #[cfg(test)]
    fn drive(&self, event: crate::hook::KeyEvent) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(hook) = guard.hook.as_mut() {
            hook.process_event(event);
        }
    }
}

impl Default for HotkeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.stop();
    }
}
