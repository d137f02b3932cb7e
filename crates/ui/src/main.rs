use gpui::*;

use deepchat::app::{OpenChat, register_commands};
use deepchat::settings::ChatSettings;

/// Application entry point.
///
/// Loads settings, initializes gpui-component and the tokio bridge, registers
/// the open-chat command and opens the first panel through it.
fn main() {
    tracing_subscriber::fmt::init();

    let settings = ChatSettings::load();
    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Must run before any Root is created.
        gpui_component::init(cx);

        settings.apply_theme(cx);
        cx.set_global(settings);

        register_commands(cx);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                cx.dispatch_action(&OpenChat);
                cx.activate(true);
            })
        })
        .detach();
    });
}
