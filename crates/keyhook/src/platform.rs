//! OS hook backends.
//!
//! Windows carries the real `WH_KEYBOARD_LL` hook. Every other platform
//! gets a null backend: the adapter behaves normally but no OS events
//! arrive, and hosts drive [`KeyboardHook::process_event`] themselves.
//!
//! [`KeyboardHook::process_event`]: crate::hook::KeyboardHook::process_event

#[cfg(not(target_os = "windows"))]
pub(crate) use null_hook::{install, HookHandle};
#[cfg(target_os = "windows")]
pub(crate) use windows_hook::{install, HookHandle};

#[cfg(target_os = "windows")]
mod windows_hook {
    use std::ptr;
    use std::sync::atomic::{AtomicPtr, Ordering};

    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK,
        KBDLLHOOKSTRUCT, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use crate::hook::{EventSink, KeyEvent};

    /// Dispatch target for the static hook procedure. Win32 gives the
    /// procedure no context pointer; `KeyboardHook` guarantees at most one
    /// installed instance, and the sink it hands over is heap-allocated so
    /// this pointer stays valid even when the hook value moves.
    static INSTANCE: AtomicPtr<EventSink> = AtomicPtr::new(ptr::null_mut());

    /// Installed `WH_KEYBOARD_LL` handle. Stored as isize so the adapter
    /// stays Send (hook handles are thread-agnostic to unhook).
    pub struct HookHandle(isize);

    pub fn install(sink: &mut EventSink) -> Result<HookHandle, u32> {
        INSTANCE.store(sink as *mut EventSink, Ordering::SeqCst);

        // NULL module handle, thread id 0: observe every thread on this
        // desktop. Events are delivered to the calling thread's message
        // loop.
        match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) } {
            Ok(handle) => Ok(HookHandle(handle.0 as isize)),
            Err(err) => {
                INSTANCE.store(ptr::null_mut(), Ordering::SeqCst);
                Err(err.code().0 as u32)
            }
        }
    }

    impl HookHandle {
        pub fn remove(self) -> bool {
            INSTANCE.store(ptr::null_mut(), Ordering::SeqCst);
            unsafe { UnhookWindowsHookEx(HHOOK(self.0 as *mut _)) }.is_ok()
        }
    }

    /// Low-level keyboard procedure. Runs synchronously and reentrantly on
    /// the thread that pumps this process's message loop. Always forwards
    /// to the next hook in the chain; the engine observes, it never
    /// consumes.
    extern "system" fn keyboard_proc(ncode: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if ncode == HC_ACTION as i32 {
            let msg = wparam.0 as u32;
            let down = msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN;
            let up = msg == WM_KEYUP || msg == WM_SYSKEYUP;
            if down || up {
                let instance = INSTANCE.load(Ordering::SeqCst);
                if !instance.is_null() {
                    unsafe {
                        let kbd = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
                        (*instance).handle(KeyEvent {
                            vk: kbd.vkCode,
                            down,
                        });
                    }
                }
            }
        }

        unsafe { CallNextHookEx(None, ncode, wparam, lparam) }
    }
}

#[cfg(not(target_os = "windows"))]
mod null_hook {
    use crate::hook::EventSink;

    /// Stand-in handle for platforms without a system hook facility
    pub struct HookHandle(());

    pub fn install(_sink: &mut EventSink) -> Result<HookHandle, u32> {
        Ok(HookHandle(()))
    }

    impl HookHandle {
        pub fn remove(self) -> bool {
            true
        }
    }
}
