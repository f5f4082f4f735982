use crate::models::{Action, Page};

/// The set of pages known to one session, in creation order.
///
/// Pages are created at most once per id and never removed.
#[derive(Debug, Default, Clone)]
pub struct PageRegistry {
    pages: Vec<Page>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with pages restored from an earlier session.
    ///
    /// Seeded pages never produce page-creation actions.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Return the page with `id`, creating it on first sight.
    ///
    /// Creation emits exactly one page-creation action carrying a snapshot of
    /// the new, still empty page.
    pub fn ensure(
        &mut self,
        id: &str,
        page_type: &str,
        title: Option<&str>,
        emit: &mut dyn FnMut(Action),
    ) -> &mut Page {
        let index = match self.position(id) {
            Some(index) => index,
            None => {
                let page = Page::new(id, page_type, title);
                log::debug!("Creating page {id} ({page_type})");
                emit(Action::page_creation(page.clone()));
                self.pages.push(page);
                self.pages.len() - 1
            }
        };
        &mut self.pages[index]
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }
}
