use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

const REFERENCE_PREFIX: &str = "blob:folio/";

/// Image bytes picked during an editing session, addressable by a
/// session-local `blob:` reference until revoked.
#[derive(Debug, Clone)]
pub struct TransientObject {
    pub id: Uuid,
    pub content_type: String,
    pub data: Bytes,
}

impl TransientObject {
    pub fn reference(&self) -> String {
        format!("{}{}", REFERENCE_PREFIX, self.id)
    }
}

#[derive(Debug, Default)]
pub struct TransientObjects {
    objects: HashMap<Uuid, TransientObject>,
}

impl TransientObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return the displayable reference.
    pub fn create(&mut self, data: Bytes, content_type: impl Into<String>) -> String {
        let object = TransientObject {
            id: Uuid::new_v4(),
            content_type: content_type.into(),
            data,
        };
        let reference = object.reference();
        debug!("Created transient object {} ({} bytes)", reference, object.data.len());
        self.objects.insert(object.id, object);
        reference
    }

    pub fn get(&self, id: Uuid) -> Option<&TransientObject> {
        self.objects.get(&id)
    }

    /// Revoke by reference. References not created here are ignored.
    pub fn revoke(&mut self, reference: &str) -> bool {
        match parse_reference(reference) {
            Some(id) => self.objects.remove(&id).is_some(),
            None => false,
        }
    }

    pub fn revoke_all(&mut self) -> usize {
        let n = self.objects.len();
        self.objects.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

pub fn parse_reference(reference: &str) -> Option<Uuid> {
    reference.strip_prefix(REFERENCE_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_revoke() {
        let mut objects = TransientObjects::new();
        let reference = objects.create(Bytes::from_static(b"\x89PNG"), "image/png");
        assert!(reference.starts_with("blob:folio/"));

        let id = parse_reference(&reference).unwrap();
        assert_eq!(objects.get(id).unwrap().content_type, "image/png");

        assert!(objects.revoke(&reference));
        assert!(!objects.revoke(&reference));
        assert!(objects.is_empty());
    }

    #[test]
    fn foreign_references_are_ignored() {
        let mut objects = TransientObjects::new();
        objects.create(Bytes::from_static(b"x"), "image/gif");
        assert!(!objects.revoke("https://example.com/a.png"));
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.revoke_all(), 1);
    }
}
