//! Ordered set of live annotations.

use super::annotation::{Annotation, AnnotationId};
use crate::render::TextureStore;

/// Owns every live annotation, in insertion order.
#[derive(Debug, Default)]
pub struct AnnotationCollection {
    items: Vec<Annotation>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an annotation. Ids are unique per session, so duplicates are a bug.
    pub fn add(&mut self, annotation: Annotation) {
        debug_assert!(!self.contains(annotation.id()), "duplicate annotation id");
        self.items.push(annotation);
    }

    /// Take an annotation out of the collection; the caller must destroy it.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.items.iter().position(|a| a.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Destroy every annotation, releasing its renderer resources.
    pub fn clear(&mut self, store: &mut dyn TextureStore) {
        let count = self.items.len();
        for annotation in self.items.drain(..) {
            annotation.destroy(store);
        }
        if count > 0 {
            log::debug!("Cleared {} annotations", count);
        }
    }

    pub fn all(&self) -> &[Annotation] {
        &self.items
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|a| a.id() == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.items.iter().any(|a| a.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::color::Rgb;
    use crate::geometry::Transform;
    use crate::model::{create_arrow, create_text_label, LabelPainter};
    use crate::tests::support::{BlockRasterizer, RecordingStore};

    fn arrow(id: u64) -> Annotation {
        create_arrow(AnnotationId(id), Vec3::ZERO, Vec3::new(0.0, id as f32, 1.0), Rgb::RED).unwrap()
    }

    fn ids(collection: &AnnotationCollection) -> Vec<AnnotationId> {
        collection.all().iter().map(Annotation::id).collect()
    }

    #[test]
    fn test_add_then_remove_restores_sequence() {
        let mut collection = AnnotationCollection::new();
        collection.add(arrow(1));
        collection.add(arrow(2));
        let before = ids(&collection);

        collection.add(arrow(3));
        let removed = collection.remove(AnnotationId(3)).unwrap();
        assert_eq!(removed.id(), AnnotationId(3));
        assert_eq!(ids(&collection), before);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut collection = AnnotationCollection::new();
        collection.add(arrow(1));
        assert!(collection.remove(AnnotationId(9)).is_none());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut collection = AnnotationCollection::new();
        for id in [5, 2, 8] {
            collection.add(arrow(id));
        }
        assert_eq!(ids(&collection), vec![AnnotationId(5), AnnotationId(2), AnnotationId(8)]);
        collection.remove(AnnotationId(2));
        assert_eq!(ids(&collection), vec![AnnotationId(5), AnnotationId(8)]);
    }

    #[test]
    fn test_clear_releases_label_textures() {
        let mut store = RecordingStore::default();
        let mut painter = LabelPainter::new(Box::new(BlockRasterizer), Default::default());
        let mut collection = AnnotationCollection::new();
        for (i, text) in ["one", "two"].into_iter().enumerate() {
            let label = create_text_label(
                AnnotationId(i as u64),
                text,
                Rgb::WHITE,
                1.0,
                Transform::IDENTITY,
                &mut painter,
                &mut store,
            )
            .unwrap();
            collection.add(label);
        }
        collection.add(arrow(10));

        collection.clear(&mut store);
        assert!(collection.is_empty());
        assert_eq!(store.released.len(), 2);
        assert!(store.live().is_empty());
    }
}
