use serde::{Deserialize, Serialize};

use super::Page;

/// One unit of the structured output stream.
///
/// Serializes to the wire shape `{ "type": ..., "page"?: ..., "options": ... }`.
/// An action whose `page` is set is a "full" action; everything a block
/// resolver emits is full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Payload of an [`Action`], keyed by its wire `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "kebab-case")]
pub enum ActionKind {
    /// A chunk of raw model output.
    Text { chunk: String },
    /// Page creation; the options are the whole page record.
    Page(Page),
    #[serde(alias = "set-mermaid")]
    SetDiagram { content: String },
    Note { content: String },
    NoteStart {},
    NoteEnd {},
    #[serde(alias = "mermaid-start")]
    DiagramStart {},
    #[serde(alias = "mermaid-end")]
    DiagramEnd {},
    #[serde(alias = "ggb-start")]
    GeometryStart {},
    #[serde(alias = "ggb-end")]
    GeometryEnd {},
    DrawStart { page: String, input: String },
    DrawEnd { result: String },
    UpdateCanvas {
        range: (f64, f64),
        domain: (f64, f64),
    },
    Element {
        name: String,
        id: String,
        attrs: serde_json::Value,
    },
}

/// Kinds of page activity that can hold a running message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunningKind {
    Note,
    Diagram,
    Geometry,
    Draw,
}

/// Activity announced by bare `-start`/`-end` actions. Draws carry their own
/// payload and are not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Note,
    Diagram,
    Geometry,
}

impl Lifecycle {
    pub fn running_kind(self) -> RunningKind {
        match self {
            Lifecycle::Note => RunningKind::Note,
            Lifecycle::Diagram => RunningKind::Diagram,
            Lifecycle::Geometry => RunningKind::Geometry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

impl Action {
    /// A raw text chunk with no page attached.
    pub fn text(chunk: impl Into<String>) -> Self {
        Self {
            page: None,
            kind: ActionKind::Text {
                chunk: chunk.into(),
            },
        }
    }

    pub fn for_page(page: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            page: Some(page.into()),
            kind,
        }
    }

    /// A page-creation action carrying a snapshot of `page`.
    pub fn page_creation(page: Page) -> Self {
        Self {
            page: None,
            kind: ActionKind::Page(page),
        }
    }

    pub fn is_full(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ActionKind::Text { .. })
    }

    /// The page this action targets. Page creation targets the page it creates.
    pub fn target_page(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Page(page) => Some(page.id.as_str()),
            _ => self.page.as_deref(),
        }
    }

    /// Start/end pairing for note, diagram and geometry lifecycle actions.
    pub fn lifecycle(&self) -> Option<(Lifecycle, Phase)> {
        match self.kind {
            ActionKind::NoteStart {} => Some((Lifecycle::Note, Phase::Start)),
            ActionKind::NoteEnd {} => Some((Lifecycle::Note, Phase::End)),
            ActionKind::DiagramStart {} => Some((Lifecycle::Diagram, Phase::Start)),
            ActionKind::DiagramEnd {} => Some((Lifecycle::Diagram, Phase::End)),
            ActionKind::GeometryStart {} => Some((Lifecycle::Geometry, Phase::Start)),
            ActionKind::GeometryEnd {} => Some((Lifecycle::Geometry, Phase::End)),
            _ => None,
        }
    }
}
