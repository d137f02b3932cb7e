use std::sync::atomic::{AtomicU64, Ordering};

use gpui::*;
use gpui_component::Root;

use crate::chat::{ChatPanel, PanelId};
use crate::settings::ChatSettings;

/// Window title of every chat panel.
pub const PANEL_TITLE: &str = "Deepseek Chat";
pub const PANEL_DEFAULT_WIDTH: f32 = 720.0;
pub const PANEL_DEFAULT_HEIGHT: f32 = 820.0;

gpui::actions!(deepchat, [OpenChat, Quit]);

/// Hands out panel ids for log correlation. Panels share nothing else.
static NEXT_PANEL_ID: AtomicU64 = AtomicU64::new(1);

fn next_panel_id() -> PanelId {
    PanelId::new(NEXT_PANEL_ID.fetch_add(1, Ordering::Relaxed))
}

/// Registers the open-chat command and its key bindings.
pub fn register_commands(cx: &mut App) {
    cx.on_action(|_: &OpenChat, cx| {
        open_chat(cx);
    });
    cx.on_action(|_: &Quit, cx| {
        cx.quit();
    });

    cx.bind_keys([
        KeyBinding::new("secondary-shift-d", OpenChat, None),
        KeyBinding::new("secondary-q", Quit, None),
    ]);
}

/// Opens a new, independent chat panel. Repeated calls open more panels.
pub fn open_chat(cx: &mut App) {
    let panel_id = next_panel_id();
    let settings = cx.try_global::<ChatSettings>().cloned().unwrap_or_default();

    let options = WindowOptions {
        window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
            None,
            size(px(PANEL_DEFAULT_WIDTH), px(PANEL_DEFAULT_HEIGHT)),
            cx,
        ))),
        titlebar: Some(TitlebarOptions {
            title: Some(PANEL_TITLE.into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let opened = cx.open_window(options, |window, cx| {
        let panel = cx.new(|cx| ChatPanel::new(panel_id, &settings, window, cx));
        // Root is required by gpui-component for inputs and notifications.
        cx.new(|cx| Root::new(panel, window, cx))
    });

    match opened {
        Ok(_) => tracing::info!(panel_id = panel_id.0, "opened chat panel"),
        Err(error) => tracing::error!(
            panel_id = panel_id.0,
            error = %error,
            "failed to open chat panel"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_ids_are_never_reused() {
        let first = next_panel_id();
        let second = next_panel_id();

        assert!(second > first);
    }
}
