//! Minimal host: starts the engine, binds a few hotkeys, and pumps the
//! message loop the hook needs.

use keyhook::{key::vk, Combination, HotkeyAction, HotkeyManager, Modifiers};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let manager = HotkeyManager::new();
    match manager.start() {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("keyboard hook refused by the OS, check permissions");
            return;
        }
        Err(e) => {
            eprintln!("failed to start hotkey engine: {e}");
            return;
        }
    }

    let help = Combination::new(vk::F1, Modifiers::WIN);
    manager.register_hotkey(HotkeyAction::new(help, "Show help", move || {
        println!("{help} pressed");
    }));

    let note = Combination::parse("win+ctrl+n").expect("valid combination");
    manager.register_hotkey(HotkeyAction::new(note, "New quick note", move || {
        println!("{note} pressed");
    }));

    println!("registered hotkeys:");
    for action in manager.registered_hotkeys() {
        println!("  {}  {}", action.combination, action.description);
    }

    pump_messages();
    manager.stop();
}

#[cfg(target_os = "windows")]
fn pump_messages() {
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, TranslateMessage, MSG,
    };

    // Hook callbacks only arrive while this thread pumps messages.
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn pump_messages() {
    println!("no OS keyboard hook on this platform, nothing to pump");
}
