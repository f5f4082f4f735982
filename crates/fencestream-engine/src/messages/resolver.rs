use uuid::Uuid;

use crate::models::{Action, ActionKind, Lifecycle, Phase, RunningKind};

use super::{DrawLookup, Message, MessageKind, RunningIndex};

type IdSource = Box<dyn FnMut() -> Uuid + Send>;

/// Reduces the ordered action stream into the message list a client renders.
///
/// Messages are only ever appended; existing ones are mutated in place to
/// stream assistant text or to end their lifecycle. For every `(page, kind)`
/// at most one message is running at a time.
pub struct MessageResolver {
    messages: Vec<Message>,
    running: RunningIndex,
    /// The next text chunk starts a fresh assistant message.
    divided: bool,
    next_id: IdSource,
    draw_lookup: DrawLookup,
}

impl MessageResolver {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            running: RunningIndex::new(),
            divided: true,
            next_id: Box::new(Uuid::new_v4),
            draw_lookup: DrawLookup::default(),
        }
    }

    /// Use `source` instead of random v4 ids (deterministic ids in tests, replays).
    pub fn with_id_source(mut self, source: impl FnMut() -> Uuid + Send + 'static) -> Self {
        self.next_id = Box::new(source);
        self
    }

    pub fn with_draw_lookup(mut self, lookup: DrawLookup) -> Self {
        self.draw_lookup = lookup;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// The running message for `(page, kind)`, if any.
    pub fn running(&self, page: &str, kind: RunningKind) -> Option<&Message> {
        self.running
            .get(page, kind)
            .and_then(|index| self.messages.get(index))
    }

    pub fn apply(&mut self, action: &Action) {
        if let ActionKind::Text { chunk } = &action.kind {
            self.append_text(chunk);
            return;
        }
        self.divided = true;

        if let Some((lifecycle, phase)) = action.lifecycle() {
            let Some(page) = action.page.as_deref() else {
                log::debug!("Ignoring {lifecycle:?} {phase:?} without a page");
                return;
            };
            let kind = lifecycle.running_kind();
            match phase {
                Phase::Start => self.start(page, kind, Self::lifecycle_message(lifecycle)),
                Phase::End => self.end(page, kind),
            }
            return;
        }

        match &action.kind {
            ActionKind::Page(page) => {
                self.push(
                    Some(page.id.clone()),
                    false,
                    MessageKind::Page {
                        page_type: page.page_type.clone(),
                    },
                );
            }
            ActionKind::SetDiagram { .. } => {
                self.single_shot(action.page.as_deref(), MessageKind::SetDiagram)
            }
            ActionKind::Note { .. } => self.single_shot(action.page.as_deref(), MessageKind::Note),
            ActionKind::DrawStart { page, input } => self.start(
                page,
                RunningKind::Draw,
                MessageKind::Draw {
                    input: input.clone(),
                    result: None,
                },
            ),
            ActionKind::DrawEnd { result } => self.end_draw(action.page.as_deref(), result),
            ActionKind::UpdateCanvas { .. } | ActionKind::Element { .. } => {}
            ActionKind::Text { .. }
            | ActionKind::NoteStart {}
            | ActionKind::NoteEnd {}
            | ActionKind::DiagramStart {}
            | ActionKind::DiagramEnd {}
            | ActionKind::GeometryStart {}
            | ActionKind::GeometryEnd {} => {}
        }
    }

    /// Append a user message; the next text chunk opens a new assistant message.
    pub fn push_user(&mut self, content: impl Into<String>, images: Vec<String>) {
        self.divided = true;
        self.push(
            None,
            false,
            MessageKind::User {
                content: content.into(),
                images,
            },
        );
    }

    /// Mark every running assistant message finished, e.g. at the end of a turn.
    pub fn finish_assistant(&mut self) {
        for message in &mut self.messages {
            if matches!(message.kind, MessageKind::Assistant { .. }) {
                message.running = false;
            }
        }
        self.divided = true;
    }

    fn lifecycle_message(lifecycle: Lifecycle) -> MessageKind {
        match lifecycle {
            Lifecycle::Note => MessageKind::Note,
            Lifecycle::Diagram => MessageKind::SetDiagram,
            Lifecycle::Geometry => MessageKind::Geometry,
        }
    }

    fn append_text(&mut self, chunk: &str) {
        if self.divided {
            self.push(
                None,
                true,
                MessageKind::Assistant {
                    content: String::new(),
                },
            );
            self.divided = false;
        }
        if let Some(Message {
            kind: MessageKind::Assistant { content },
            ..
        }) = self.messages.last_mut()
        {
            content.push_str(chunk);
        }
    }

    fn push(&mut self, page: Option<String>, running: bool, kind: MessageKind) -> usize {
        self.messages.push(Message {
            id: (self.next_id)(),
            page,
            running,
            kind,
        });
        self.messages.len() - 1
    }

    fn start(&mut self, page: &str, kind: RunningKind, message: MessageKind) {
        // A new start supersedes a message of the same kind still open on the page.
        if let Some(previous) = self.running.remove(page, kind) {
            log::debug!("{kind:?} on {page} restarted before it ended");
            self.messages[previous].running = false;
        }
        let index = self.push(Some(page.to_string()), true, message);
        self.running.insert(page, kind, index);
    }

    fn end(&mut self, page: &str, kind: RunningKind) {
        match self.running.remove(page, kind) {
            Some(index) => self.messages[index].running = false,
            None => log::debug!("{kind:?} end on {page} without a running message"),
        }
    }

    /// Producers that never emit start/end still get one message per page and
    /// kind; while a paired message is running it stands in for this one.
    fn single_shot(&mut self, page: Option<&str>, message: MessageKind) {
        let Some(page) = page else {
            log::debug!("Ignoring {} action without a page", message.label());
            return;
        };
        let running = message
            .running_kind()
            .and_then(|kind| self.running.get(page, kind));
        if running.is_none() {
            self.push(Some(page.to_string()), false, message);
        }
    }

    fn end_draw(&mut self, page: Option<&str>, result: &str) {
        let Some(index) = self
            .draw_lookup
            .locate(&self.messages, &self.running, page)
        else {
            log::debug!("draw-end with no message to finish");
            return;
        };
        self.running.release(index);
        let message = &mut self.messages[index];
        message.running = false;
        if let MessageKind::Draw { result: slot, .. } = &mut message.kind {
            *slot = Some(result.to_string());
        }
    }
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::new()
    }
}
