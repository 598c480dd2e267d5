/// Index-based intrusive doubly linked list of objects.
///
/// The list head lives in a node, the `prev`/`next` links live in each
/// `ObjectSlot`. Every operation goes through the object slot map, so a
/// removed object can never be reached through a dangling link.

use slotmap::SlotMap;
use super::object_slot::{ListLinks, ObjectKey, ObjectSlot};

pub type ObjectSlots = SlotMap<ObjectKey, ObjectSlot>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectList {
    first: Option<ObjectKey>,
    last: Option<ObjectKey>,
    len: usize,
}

impl ObjectList {
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn first(&self) -> Option<ObjectKey> {
        self.first
    }

    pub fn last(&self) -> Option<ObjectKey> {
        self.last
    }

    pub fn push_back(&mut self, objects: &mut ObjectSlots, key: ObjectKey) {
        match objects.get_mut(key) {
            Some(slot) => slot.links = ListLinks { prev: self.last, next: None },
            None => return,
        }
        match self.last.and_then(|last| objects.get_mut(last)) {
            Some(last) => last.links.next = Some(key),
            None => self.first = Some(key),
        }
        self.last = Some(key);
        self.len += 1;
    }

    pub fn push_front(&mut self, objects: &mut ObjectSlots, key: ObjectKey) {
        match objects.get_mut(key) {
            Some(slot) => slot.links = ListLinks { prev: None, next: self.first },
            None => return,
        }
        match self.first.and_then(|first| objects.get_mut(first)) {
            Some(first) => first.links.prev = Some(key),
            None => self.last = Some(key),
        }
        self.first = Some(key);
        self.len += 1;
    }

    /// Remove `key` from this list. The key must be linked here.
    pub fn unlink(&mut self, objects: &mut ObjectSlots, key: ObjectKey) {
        let links = match objects.get(key) {
            Some(slot) => slot.links,
            None => return,
        };

        match links.prev {
            Some(prev) => {
                if let Some(slot) = objects.get_mut(prev) {
                    slot.links.next = links.next;
                }
            }
            None => {
                debug_assert_eq!(self.first, Some(key), "object list corrupted: unlinking a foreign head");
                self.first = links.next;
            }
        }
        match links.next {
            Some(next) => {
                if let Some(slot) = objects.get_mut(next) {
                    slot.links.prev = links.prev;
                }
            }
            None => {
                debug_assert_eq!(self.last, Some(key), "object list corrupted: unlinking a foreign tail");
                self.last = links.prev;
            }
        }

        if let Some(slot) = objects.get_mut(key) {
            slot.links = ListLinks::default();
        }
        self.len = self.len.saturating_sub(1);
    }

    pub fn move_to_back(&mut self, objects: &mut ObjectSlots, key: ObjectKey) {
        if self.last == Some(key) {
            return;
        }
        self.unlink(objects, key);
        self.push_back(objects, key);
    }

    pub fn iter<'a>(&self, objects: &'a ObjectSlots) -> ObjectListIter<'a> {
        ObjectListIter { objects, next: self.first }
    }

    /// Snapshot of the keys, for loops that mutate the slot map.
    pub fn keys(&self, objects: &ObjectSlots) -> Vec<ObjectKey> {
        self.iter(objects).map(|(key, _)| key).collect()
    }

    /// Walk the list both ways and compare with the recorded length.
    pub fn is_consistent(&self, objects: &ObjectSlots) -> bool {
        let mut count = 0;
        let mut prev = None;
        let mut cursor = self.first;
        while let Some(key) = cursor {
            let Some(slot) = objects.get(key) else { return false };
            if slot.links.prev != prev {
                return false;
            }
            count += 1;
            if count > self.len {
                return false;
            }
            prev = Some(key);
            cursor = slot.links.next;
        }
        prev == self.last && count == self.len
    }
}

pub struct ObjectListIter<'a> {
    objects: &'a ObjectSlots,
    next: Option<ObjectKey>,
}

impl<'a> Iterator for ObjectListIter<'a> {
    type Item = (ObjectKey, &'a ObjectSlot);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.next?;
        let slot = self.objects.get(key)?;
        self.next = slot.links.next;
        Some((key, slot))
    }
}

#[cfg(test)]
#[path = "object_list_tests.rs"]
mod tests;
