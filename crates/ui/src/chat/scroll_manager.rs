use gpui::ScrollHandle;

/// Keeps the chat log pinned to its newest turn.
pub struct ScrollManager {
    scroll_handle: ScrollHandle,
    pending_scroll_to_bottom: bool,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: ScrollHandle::new(),
            pending_scroll_to_bottom: false,
        }
    }

    pub fn handle(&self) -> &ScrollHandle {
        &self.scroll_handle
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
    }

    /// Applies a pending request. The handle scrolls once the next layout has
    /// measured the appended turn.
    pub fn apply_pending_scroll(&mut self) -> bool {
        let should_scroll = self.pending_scroll_to_bottom;
        if should_scroll {
            self.scroll_handle.scroll_to_bottom();
        }

        self.pending_scroll_to_bottom = false;
        should_scroll
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}
