use crate::models::{Action, ActionKind, Page};

/// Resolves a `mermaid` block into a `set-diagram` action for the page.
pub fn resolve_mermaid(page: &mut Page, content: &str, emit: &mut dyn FnMut(Action)) -> Action {
    let action = Action::for_page(
        page.id.clone(),
        ActionKind::SetDiagram {
            content: content.to_string(),
        },
    );
    page.steps.push(action.clone());
    emit(action.clone());
    action
}
