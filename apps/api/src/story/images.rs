//! Illustration slots and the sparse image map consulted by the layout.
//!
//! Slot indexing (one slot per document section):
//! ```text
//! 0 = cover   1 = world   2 = characters   3..=7 = chapters 0..=4   8 = ending
//! ```

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::story::validation::ACT_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "chapter", rename_all = "snake_case")]
pub enum PageSlot {
    Cover,
    World,
    Characters,
    Chapter(usize),
    Ending,
}

impl PageSlot {
    const FIRST_CHAPTER: usize = 3;
    pub const COUNT: usize = Self::FIRST_CHAPTER + ACT_COUNT + 1;

    pub fn index(self) -> usize {
        match self {
            PageSlot::Cover => 0,
            PageSlot::World => 1,
            PageSlot::Characters => 2,
            PageSlot::Chapter(i) => Self::FIRST_CHAPTER + i,
            PageSlot::Ending => Self::FIRST_CHAPTER + ACT_COUNT,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PageSlot::Cover),
            1 => Some(PageSlot::World),
            2 => Some(PageSlot::Characters),
            i if (Self::FIRST_CHAPTER..Self::FIRST_CHAPTER + ACT_COUNT).contains(&i) => {
                Some(PageSlot::Chapter(i - Self::FIRST_CHAPTER))
            }
            i if i == Self::FIRST_CHAPTER + ACT_COUNT => Some(PageSlot::Ending),
            _ => None,
        }
    }

    /// All slots in document order.
    pub fn all() -> impl Iterator<Item = PageSlot> {
        (0..Self::COUNT).filter_map(PageSlot::from_index)
    }
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSlot::Cover => f.write_str("cover"),
            PageSlot::World => f.write_str("world"),
            PageSlot::Characters => f.write_str("characters"),
            PageSlot::Chapter(i) => write!(f, "chapter {}", i + 1),
            PageSlot::Ending => f.write_str("ending"),
        }
    }
}

/// A generated illustration: raw image bytes plus MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Sparse slot → illustration map. Absence means "no illustration for this page".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMap {
    images: BTreeMap<PageSlot, ImagePayload>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: PageSlot, payload: ImagePayload) {
        self.images.insert(slot, payload);
    }

    pub fn get(&self, slot: PageSlot) -> Option<&ImagePayload> {
        self.images.get(&slot)
    }

    pub fn contains(&self, slot: PageSlot) -> bool {
        self.images.contains_key(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = PageSlot> + '_ {
        self.images.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_index_is_a_bijection() {
        for index in 0..PageSlot::COUNT {
            let slot = PageSlot::from_index(index).unwrap();
            assert_eq!(slot.index(), index);
        }
        assert_eq!(PageSlot::from_index(PageSlot::COUNT), None);
    }

    #[test]
    fn test_slot_layout() {
        assert_eq!(PageSlot::Chapter(0).index(), 3);
        assert_eq!(PageSlot::Chapter(4).index(), 7);
        assert_eq!(PageSlot::Ending.index(), 8);
        assert_eq!(PageSlot::all().count(), 9);
    }

    #[test]
    fn test_image_map_sparse_access() {
        let mut images = ImageMap::new();
        images.insert(
            PageSlot::Chapter(2),
            ImagePayload {
                mime_type: "image/png".into(),
                bytes: Bytes::from_static(b"png"),
            },
        );
        assert!(images.contains(PageSlot::Chapter(2)));
        assert!(images.get(PageSlot::Chapter(1)).is_none());
        assert_eq!(images.slots().collect::<Vec<_>>(), vec![PageSlot::Chapter(2)]);
    }
}
