use serde::{Deserialize, Serialize};

use crate::element::{content_length, plain_text, Element};
use crate::rule::SessionContext;

/// Session attributes the host attaches to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageSession {
    pub platform: Option<String>,
    /// Id of the bot sending the message
    pub self_id: Option<String>,
    pub user_id: Option<String>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    /// Raw content of the message that triggered this reply
    pub content: Option<String>,
    /// Name of the command being answered
    pub command: Option<String>,
}

/// A message about to be sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default)]
    pub session: MessageSession,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl OutboundMessage {
    pub fn new(session: MessageSession, elements: Vec<Element>) -> Self {
        Self { session, elements }
    }

    /// Platform name, or `""` when the host did not provide one.
    pub fn platform(&self) -> &str {
        self.session.platform.as_deref().unwrap_or_default()
    }

    /// Rule evaluation context for this message.
    ///
    /// When the host supplies no raw content, the plain text of the elements
    /// stands in for it.
    pub fn session_context(&self) -> SessionContext {
        let session = &self.session;
        SessionContext {
            platform: session.platform.clone(),
            bot_id: session.self_id.clone(),
            user_id: session.user_id.clone(),
            guild_id: session.guild_id.clone(),
            channel_id: session.channel_id.clone(),
            content: session
                .content
                .clone()
                .or_else(|| Some(plain_text(&self.elements))),
            content_length: content_length(&self.elements),
            command: session.command.clone(),
        }
    }
}
