//! Outbound chat boundary used by session workers.

use std::sync::atomic::{AtomicI64, Ordering};

use futures::future::{self, BoxFuture};
use thiserror::Error;
use tracing::info;

/// Identifier of a chat as assigned by the chat platform.
pub type ChatId = i64;
/// Identifier of a message inside a chat.
pub type MessageId = i64;

/// Failures reported by a messenger backend.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// The request never reached the platform.
    #[error("failed to reach chat platform")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The platform answered but refused the call.
    #[error("chat platform rejected `{method}`: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },
}

/// Markup dialect of an outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram-flavoured HTML.
    Html,
}

impl ParseMode {
    /// Wire name of the dialect.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
        }
    }
}

/// Text message to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText {
    /// Message body.
    pub text: String,
    /// Deliver without a notification sound.
    pub silent: bool,
    /// Thread the message under this one.
    pub reply_to: Option<MessageId>,
    /// Markup dialect, plain text when `None`.
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingText {
    /// Plain, audible, unthreaded message.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            silent: false,
            reply_to: None,
            parse_mode: None,
        }
    }

    /// Thread the message under `message_id` when present.
    pub fn reply_to(mut self, message_id: Option<MessageId>) -> Self {
        self.reply_to = message_id;
        self
    }

    /// Deliver silently.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Interpret the body as `mode` markup.
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }
}

/// Photo message to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPhoto {
    /// URL of the image to display.
    pub url: String,
    /// Caption shown under the image.
    pub caption: String,
    /// Thread the photo under this message.
    pub reply_to: Option<MessageId>,
}

/// Chat transport consumed by the session engine.
pub trait Messenger: Send + Sync {
    /// Send a text message, returning the id of the delivered message.
    fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingText,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>>;

    /// Send a photo, returning the id of the delivered message.
    fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutgoingPhoto,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>>;
}

/// Messenger that only logs what it would have sent.
#[derive(Debug, Default)]
pub struct LogMessenger {
    next_id: AtomicI64,
}

impl LogMessenger {
    /// Create a messenger numbering messages from 1.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Messenger for LogMessenger {
    fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingText,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        let message_id = self.allocate_id();
        info!(
            chat_id,
            message_id,
            reply_to = ?message.reply_to,
            silent = message.silent,
            text = %message.text,
            "send message"
        );
        Box::pin(future::ready(Ok(message_id)))
    }

    fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutgoingPhoto,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        let message_id = self.allocate_id();
        info!(
            chat_id,
            message_id,
            reply_to = ?photo.reply_to,
            url = %photo.url,
            caption = %photo.caption,
            "send photo"
        );
        Box::pin(future::ready(Ok(message_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_messenger_numbers_messages() {
        let messenger = LogMessenger::new();
        let first = messenger
            .send_message(1, OutgoingText::plain("hello"))
            .await
            .unwrap();
        let second = messenger
            .send_photo(
                1,
                OutgoingPhoto {
                    url: "https://example.invalid/q.png".into(),
                    caption: "caption".into(),
                    reply_to: Some(first),
                },
            )
            .await
            .unwrap();

        assert_eq!((first, second), (1, 2));
    }

    #[test]
    fn builder_sets_optional_fields() {
        let text = OutgoingText::plain("done")
            .silent()
            .reply_to(Some(9))
            .parse_mode(ParseMode::Html);

        assert!(text.silent);
        assert_eq!(text.reply_to, Some(9));
        assert_eq!(text.parse_mode.map(|mode| mode.as_str()), Some("HTML"));
    }
}
