//! # Messages
//!
//! The display-ready view of a session: an ordered list of messages that only
//! ever grows, with individual messages mutated in place as their content
//! streams in or their lifecycle ends.
//!
//! - **`resolver`**: `MessageResolver` reduces the action stream into the list
//! - **`running`**: `RunningIndex` maps `(page, kind)` to the open message
//! - **`draw`**: `DrawLookup` policy choosing which message a `draw-end` closes

pub mod draw;
pub mod resolver;
pub mod running;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RunningKind;

pub use draw::DrawLookup;
pub use resolver::MessageResolver;
pub use running::RunningIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Lifecycle started and not yet ended; rendered as "in progress".
    #[serde(default)]
    pub running: bool,
    #[serde(flatten)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageKind {
    User {
        content: String,
        #[serde(default)]
        images: Vec<String>,
    },
    Assistant {
        content: String,
    },
    Note,
    SetDiagram,
    Page {
        #[serde(rename = "pageType")]
        page_type: String,
    },
    Geometry,
    Draw {
        input: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
}

impl MessageKind {
    /// The running-index slot messages of this kind occupy, if any.
    pub fn running_kind(&self) -> Option<RunningKind> {
        match self {
            MessageKind::Note => Some(RunningKind::Note),
            MessageKind::SetDiagram => Some(RunningKind::Diagram),
            MessageKind::Geometry => Some(RunningKind::Geometry),
            MessageKind::Draw { .. } => Some(RunningKind::Draw),
            MessageKind::User { .. } | MessageKind::Assistant { .. } | MessageKind::Page { .. } => {
                None
            }
        }
    }

    /// Short label used when printing a message list.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::User { .. } => "user",
            MessageKind::Assistant { .. } => "assistant",
            MessageKind::Note => "note",
            MessageKind::SetDiagram => "set-diagram",
            MessageKind::Page { .. } => "page",
            MessageKind::Geometry => "geometry",
            MessageKind::Draw { .. } => "draw",
        }
    }
}
