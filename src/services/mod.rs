/// Health check service.
pub mod health_service;
/// Outbound chat boundary and the logging messenger.
pub mod messenger;
/// Startup restoration of checkpointed sessions.
pub mod recovery;
/// Question image rendering boundary.
pub mod renderer;
/// Session lifecycle operations behind the HTTP surface.
pub mod session_service;
/// Telegram Bot API messenger.
pub mod telegram;
