use serde::{Deserialize, Serialize};

use crate::models::RunningKind;

use super::{Message, RunningIndex};

/// Which message a `draw-end` action finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawLookup {
    /// The most recently pushed message in the whole list, whatever its page
    /// or kind. Breaks when other activity lands between start and end.
    #[default]
    LastMessage,
    /// The running draw message for the action's page.
    RunningForPage,
}

impl DrawLookup {
    pub(crate) fn locate(
        self,
        messages: &[Message],
        running: &RunningIndex,
        page: Option<&str>,
    ) -> Option<usize> {
        match self {
            DrawLookup::LastMessage => messages.len().checked_sub(1),
            DrawLookup::RunningForPage => running.get(page?, RunningKind::Draw),
        }
    }
}
