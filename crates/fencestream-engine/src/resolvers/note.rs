use crate::models::{Action, ActionKind, Page};

/// Resolves a `note` block: the content is kept in `page.notes` and
/// committed as a `note` action.
pub fn resolve_note(page: &mut Page, content: &str, emit: &mut dyn FnMut(Action)) -> Action {
    page.notes.push(content.to_string());
    let action = Action::for_page(
        page.id.clone(),
        ActionKind::Note {
            content: content.to_string(),
        },
    );
    page.steps.push(action.clone());
    emit(action.clone());
    action
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_note_content() {
        let mut page = Page::new("n1", "note", Some("Lecture"));
        let mut emitted = vec![];

        resolve_note(&mut page, "first", &mut |a| emitted.push(a));
        resolve_note(&mut page, "second", &mut |a| emitted.push(a));

        assert_eq!(page.notes, ["first", "second"]);
        assert_eq!(page.steps.len(), 2);
        assert_eq!(emitted, page.steps);
    }
}
