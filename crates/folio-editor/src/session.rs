use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use folio_types::layout::{Element, ElementBody, Page, Position, Properties, Size, StylePatch};

use crate::error::{EditorError, Result};
use crate::objects::{TransientObject, TransientObjects, parse_reference};

/// Smallest box the resize handle produces.
pub const MIN_SIZE: Size = Size { width: 50, height: 20 };

/// Editing state for one admin's layout work.
///
/// All element operations apply to the selected page only; flipping to
/// another page redirects them.
#[derive(Debug)]
pub struct EditorSession {
    id: Uuid,
    owner: Uuid,
    magazine_id: Option<Uuid>,
    pages: Vec<Page>,
    selected_page: usize,
    selected_element: Option<Uuid>,
    objects: TransientObjects,
}

impl EditorSession {
    /// A fresh session with one empty page.
    pub fn new(owner: Uuid) -> Self {
        Self::with_pages(owner, None, Vec::new())
    }

    /// Resume a saved layout. An empty layout still gets one page.
    pub fn with_pages(owner: Uuid, magazine_id: Option<Uuid>, mut pages: Vec<Page>) -> Self {
        if pages.is_empty() {
            pages.push(Page::empty());
        }
        Self {
            id: Uuid::new_v4(),
            owner,
            magazine_id,
            pages,
            selected_page: 0,
            selected_element: None,
            objects: TransientObjects::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn magazine_id(&self) -> Option<Uuid> {
        self.magazine_id
    }

    pub fn set_magazine(&mut self, magazine_id: Uuid) {
        self.magazine_id = Some(magazine_id);
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn selected_page(&self) -> usize {
        self.selected_page
    }

    pub fn selected_element_id(&self) -> Option<Uuid> {
        self.selected_element
    }

    pub fn selected_element(&self) -> Option<&Element> {
        self.current_page().element(self.selected_element?)
    }

    /// Properties panel contents for the selection, if any.
    pub fn properties(&self) -> Option<Properties> {
        self.selected_element().map(Properties::of)
    }

    pub fn object(&self, id: Uuid) -> Option<&TransientObject> {
        self.objects.get(id)
    }

    // -- Pages --

    /// Append an empty page and select it. Returns its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::empty());
        self.selected_page = self.pages.len() - 1;
        self.selected_element = None;
        self.selected_page
    }

    /// Page-turn: subsequent operations target `index`.
    pub fn flip_to(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(EditorError::PageOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        if index != self.selected_page {
            self.selected_element = None;
        }
        self.selected_page = index;
        Ok(())
    }

    // -- Elements --

    pub fn add_text(&mut self) -> &Element {
        self.push_element(Element::text())
    }

    pub fn add_image(&mut self, data: Bytes, content_type: &str) -> Result<&Element> {
        if data.is_empty() {
            return Err(EditorError::EmptyImage);
        }
        let reference = self.objects.create(data, content_type);
        Ok(self.push_element(Element::image(reference)))
    }

    pub fn update_content(&mut self, id: Uuid, content: String) -> Result<&Element> {
        let el = self.element_mut(id)?;
        let replaced = match &mut el.body {
            ElementBody::Text { content: current, .. } => {
                *current = content;
                None
            }
            ElementBody::Image { source } => Some(std::mem::replace(source, content)),
        };
        if let Some(old) = replaced {
            self.objects.revoke(&old);
        }
        self.find(id)
    }

    /// Merge `patch` into the element's style. Untouched fields keep their values.
    pub fn update_style(&mut self, id: Uuid, patch: StylePatch) -> Result<&Element> {
        let el = self.element_mut(id)?;
        match &mut el.body {
            ElementBody::Text {
                font_size, color, ..
            } => {
                if let Some(size) = patch.font_size {
                    *font_size = size;
                }
                if let Some(c) = patch.color {
                    *color = c;
                }
            }
            ElementBody::Image { .. } => {
                if patch.font_size.is_some() {
                    return Err(EditorError::StyleNotApplicable("font size"));
                }
                if patch.color.is_some() {
                    return Err(EditorError::StyleNotApplicable("color"));
                }
            }
        }
        if let Some(width) = patch.width {
            el.size.width = width;
        }
        if let Some(height) = patch.height {
            el.size.height = height;
        }
        self.find(id)
    }

    /// Drag-stop.
    pub fn update_position(&mut self, id: Uuid, x: f64, y: f64) -> Result<&Element> {
        self.element_mut(id)?.position = Position { x, y };
        self.find(id)
    }

    /// Resize-stop. Clamped to [`MIN_SIZE`].
    pub fn resize(&mut self, id: Uuid, width: u32, height: u32) -> Result<&Element> {
        self.update_style(
            id,
            StylePatch {
                width: Some(width.max(MIN_SIZE.width)),
                height: Some(height.max(MIN_SIZE.height)),
                ..StylePatch::default()
            },
        )
    }

    pub fn remove_element(&mut self, id: Uuid) -> Result<Element> {
        let page = &mut self.pages[self.selected_page];
        let pos = page
            .elements
            .iter()
            .position(|el| el.id == id)
            .ok_or(EditorError::ElementNotFound(id))?;
        let removed = page.elements.remove(pos);

        if self.selected_element == Some(id) {
            self.selected_element = None;
        }
        if let ElementBody::Image { source } = &removed.body {
            self.objects.revoke(source);
        }
        Ok(removed)
    }

    /// Select an element on the selected page, or clear the selection.
    pub fn select(&mut self, id: Option<Uuid>) -> Result<()> {
        if let Some(id) = id {
            self.find(id)?;
        }
        self.selected_element = id;
        Ok(())
    }

    /// Whether a transient reference still resolves in this session.
    pub fn resolves(&self, reference: &str) -> bool {
        parse_reference(reference).is_some_and(|id| self.objects.get(id).is_some())
    }

    /// Release every transient object. Returns how many were revoked.
    pub fn close(&mut self) -> usize {
        let revoked = self.objects.revoke_all();
        debug!("Editor session {} closed, {} objects revoked", self.id, revoked);
        revoked
    }

    fn current_page(&self) -> &Page {
        &self.pages[self.selected_page]
    }

    fn push_element(&mut self, element: Element) -> &Element {
        let page = &mut self.pages[self.selected_page];
        page.elements.push(element);
        &page.elements[page.elements.len() - 1]
    }

    fn find(&self, id: Uuid) -> Result<&Element> {
        self.current_page()
            .element(id)
            .ok_or(EditorError::ElementNotFound(id))
    }

    fn element_mut(&mut self, id: Uuid) -> Result<&mut Element> {
        self.pages[self.selected_page]
            .element_mut(id)
            .ok_or(EditorError::ElementNotFound(id))
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.objects.revoke_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditorSession {
        EditorSession::new(Uuid::new_v4())
    }

    fn png() -> Bytes {
        Bytes::from_static(b"\x89PNG\r\n")
    }

    #[test]
    fn starts_with_one_empty_page() {
        let s = session();
        assert_eq!(s.pages().len(), 1);
        assert!(s.pages()[0].elements.is_empty());
        assert_eq!(s.selected_page(), 0);
        assert!(s.selected_element().is_none());
    }

    #[test]
    fn add_page_selects_the_new_page() {
        let mut s = session();
        assert_eq!(s.add_page(), 1);
        assert_eq!(s.add_page(), 2);
        assert_eq!(s.pages().len(), 3);
        assert_eq!(s.selected_page(), 2);
    }

    #[test]
    fn add_text_touches_only_the_selected_page() {
        let mut s = session();
        s.add_page();
        s.flip_to(0).unwrap();
        s.add_text();

        let el = s.add_text().clone();
        assert_eq!(s.pages()[0].elements.len(), 2);
        assert!(s.pages()[1].elements.is_empty());

        assert_eq!(el.position, Position { x: 20.0, y: 20.0 });
        assert_eq!(el.size, Size { width: 150, height: 50 });
        assert_eq!(
            el.body,
            ElementBody::Text {
                content: "New Text".into(),
                font_size: 16,
                color: "#000".into(),
            }
        );
    }

    #[test]
    fn add_image_uses_a_transient_reference() {
        let mut s = session();
        let el = s.add_image(png(), "image/png").unwrap().clone();
        assert_eq!(el.size, Size { width: 200, height: 150 });
        assert!(s.resolves(el.content()));
        assert_eq!(
            s.add_image(Bytes::new(), "image/png").unwrap_err(),
            EditorError::EmptyImage
        );
    }

    #[test]
    fn style_update_merges() {
        let mut s = session();
        let id = s.add_text().id;
        s.update_style(
            id,
            StylePatch {
                color: Some("#f00".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let el = s
            .update_style(
                id,
                StylePatch {
                    font_size: Some(24),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(
            el.body,
            ElementBody::Text {
                content: "New Text".into(),
                font_size: 24,
                color: "#f00".into(),
            }
        );
        assert_eq!(el.size, Size { width: 150, height: 50 });
    }

    #[test]
    fn typography_on_images_is_rejected() {
        let mut s = session();
        let id = s.add_image(png(), "image/png").unwrap().id;
        let err = s
            .update_style(
                id,
                StylePatch {
                    font_size: Some(12),
                    width: Some(10),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, EditorError::StyleNotApplicable("font size"));
        assert_eq!(s.pages()[0].elements[0].size.width, 200);
    }

    #[test]
    fn position_and_content_update_in_place() {
        let mut s = session();
        let first = s.add_text().id;
        let second = s.add_text().id;

        s.update_position(first, 120.5, 40.0).unwrap();
        s.update_content(first, "Headline".into()).unwrap();

        let page = &s.pages()[0];
        let a = page.element(first).unwrap();
        assert_eq!(a.position, Position { x: 120.5, y: 40.0 });
        assert_eq!(a.content(), "Headline");
        let b = page.element(second).unwrap();
        assert_eq!(b.position, Element::DEFAULT_POSITION);
        assert_eq!(b.content(), "New Text");
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let mut s = session();
        let id = s.add_text().id;
        let el = s.resize(id, 10, 5).unwrap();
        assert_eq!(el.size, MIN_SIZE);
        let el = s.resize(id, 300, 90).unwrap();
        assert_eq!(el.size, Size { width: 300, height: 90 });
    }

    #[test]
    fn operations_follow_the_flipped_page() {
        let mut s = session();
        let on_first = s.add_text().id;
        s.add_page();

        assert_eq!(
            s.update_content(on_first, "x".into()).unwrap_err(),
            EditorError::ElementNotFound(on_first)
        );
        s.flip_to(0).unwrap();
        assert!(s.update_content(on_first, "x".into()).is_ok());
        assert_eq!(
            s.flip_to(7).unwrap_err(),
            EditorError::PageOutOfRange { index: 7, len: 2 }
        );
    }

    #[test]
    fn selection_drives_properties() {
        let mut s = session();
        let text = s.add_text().id;
        let image = s.add_image(png(), "image/png").unwrap().id;

        assert!(s.properties().is_none());
        s.select(Some(text)).unwrap();
        assert_eq!(
            s.properties(),
            Some(Properties::Text {
                font_size: 16,
                color: "#000".into()
            })
        );
        s.select(Some(image)).unwrap();
        assert_eq!(
            s.properties(),
            Some(Properties::Image {
                width: 200,
                height: 150
            })
        );
        assert!(s.select(Some(Uuid::new_v4())).is_err());
        assert_eq!(s.selected_element_id(), Some(image));

        s.add_page();
        assert!(s.selected_element().is_none());
    }

    #[test]
    fn remove_clears_selection_and_revokes_image() {
        let mut s = session();
        let el = s.add_image(png(), "image/png").unwrap().clone();
        s.select(Some(el.id)).unwrap();

        let removed = s.remove_element(el.id).unwrap();
        assert_eq!(removed.id, el.id);
        assert!(s.selected_element_id().is_none());
        assert!(!s.resolves(el.content()));
        assert!(s.pages()[0].elements.is_empty());
        assert!(s.remove_element(el.id).is_err());
    }

    #[test]
    fn replacing_image_source_revokes_the_old_object() {
        let mut s = session();
        let el = s.add_image(png(), "image/png").unwrap().clone();
        s.update_content(el.id, "https://cdn.example.com/a.jpg".into())
            .unwrap();
        assert!(!s.resolves(el.content()));
    }

    #[test]
    fn close_revokes_everything() {
        let mut s = session();
        s.add_image(png(), "image/png").unwrap();
        s.add_image(png(), "image/jpeg").unwrap();
        assert_eq!(s.close(), 2);
        assert_eq!(s.close(), 0);
    }

    #[test]
    fn saved_layout_resumes() {
        let mut page = Page::empty();
        page.elements.push(Element::text());
        let s = EditorSession::with_pages(Uuid::new_v4(), Some(Uuid::new_v4()), vec![page.clone()]);
        assert_eq!(s.pages(), &[page][..]);

        let s = EditorSession::with_pages(Uuid::new_v4(), None, Vec::new());
        assert_eq!(s.pages().len(), 1);
    }
}
