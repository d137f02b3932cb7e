pub mod accumulator;
/// Request lifecycle between the surface and the inference provider.
pub mod controller;
/// Panel/surface protocol messages.
pub mod events;
pub mod log;
/// Chat turns and identifiers.
pub mod message;
pub mod message_input;
pub mod panel;
pub mod scroll_manager;
pub mod surface;

pub use accumulator::ResponseAccumulator;
pub use controller::{BackendFailure, BusyFlag, ControllerTask, PanelController};
pub use events::{ControllerMessage, Submit, SurfaceMessage};
pub use log::ChatLog;
pub use message::{ChatTurn, PanelId, RequestId, Sender};
pub use message_input::MessageInput;
pub use panel::ChatPanel;
pub use scroll_manager::ScrollManager;
pub use surface::ChatSurface;
