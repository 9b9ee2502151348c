//! Telegram Bot API implementation of [`Messenger`].

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::messenger::{
    ChatId, MessageId, Messenger, MessengerError, OutgoingPhoto, OutgoingText,
};

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Messenger posting to the Telegram Bot API with a bot token.
#[derive(Clone)]
pub struct TelegramMessenger {
    client: Client,
    endpoint: Arc<str>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: ChatId,
    text: &'a str,
    disable_notification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct SendPhotoBody<'a> {
    chat_id: ChatId,
    photo: &'a str,
    caption: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<MessageId>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

impl TelegramMessenger {
    /// Messenger for the bot identified by `token`.
    pub fn new(api_base: &str, token: &str) -> Self {
        let endpoint = format!("{}/bot{}", api_base.trim_end_matches('/'), token);
        Self {
            client: Client::new(),
            endpoint: Arc::from(endpoint),
        }
    }

    async fn call<B: Serialize>(
        &self,
        method: &'static str,
        body: &B,
    ) -> Result<MessageId, MessengerError> {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .send()
            .await
            .map_err(|err| MessengerError::Transport(Box::new(err)))?;

        // Telegram reports failures in the body even on non-2xx statuses.
        let reply = response
            .json::<ApiResponse>()
            .await
            .map_err(|err| MessengerError::Transport(Box::new(err)))?;

        match reply {
            ApiResponse {
                ok: true,
                result: Some(sent),
                ..
            } => Ok(sent.message_id),
            ApiResponse { description, .. } => Err(MessengerError::Rejected {
                method,
                description: description.unwrap_or_else(|| "no description".into()),
            }),
        }
    }
}

impl Messenger for TelegramMessenger {
    fn send_message(
        &self,
        chat_id: ChatId,
        message: OutgoingText,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        let this = self.clone();
        Box::pin(async move {
            let body = SendMessageBody {
                chat_id,
                text: &message.text,
                disable_notification: message.silent,
                reply_to_message_id: message.reply_to,
                parse_mode: message.parse_mode.map(|mode| mode.as_str()),
            };
            this.call("sendMessage", &body).await
        })
    }

    fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutgoingPhoto,
    ) -> BoxFuture<'static, Result<MessageId, MessengerError>> {
        let this = self.clone();
        Box::pin(async move {
            let body = SendPhotoBody {
                chat_id,
                photo: &photo.url,
                caption: &photo.caption,
                reply_to_message_id: photo.reply_to,
            };
            this.call("sendPhoto", &body).await
        })
    }
}
