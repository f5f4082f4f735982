use crate::models::{Action, ActionKind, Page};

/// Client-side mirror of the pages a session has produced.
///
/// Page-creation actions load a page and make it current. Narration and
/// start/end lifecycle actions never reach a page's steps; every other action
/// is appended to the steps of the page it targets.
#[derive(Debug, Default, Clone)]
pub struct Board {
    pages: Vec<Page>,
    current: Option<String>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a page and make it current.
    pub fn load_page(&mut self, page: Page) {
        log::debug!("Loading page {}", page.id);
        self.current = Some(page.id.clone());
        self.pages.push(page);
    }

    pub fn load_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        for page in pages {
            self.load_page(page);
        }
    }

    pub fn apply(&mut self, action: &Action) {
        match &action.kind {
            ActionKind::Page(page) => self.load_page(page.clone()),
            ActionKind::Text { .. } => {}
            _ if action.lifecycle().is_some() => {}
            _ => {
                let Some(target) = action.page.as_deref() else {
                    return;
                };
                if let Some(page) = self.pages.iter_mut().find(|p| p.id == target) {
                    page.steps.push(action.clone());
                }
            }
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// The most recently loaded page.
    pub fn current(&self) -> Option<&Page> {
        self.current.as_deref().and_then(|id| self.page(id))
    }
}
