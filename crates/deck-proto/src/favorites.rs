use crate::store::{self, KvStore};
use tracing::warn;

/// Ordered favorite station ids, persisted apart from station data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Favorites {
    ids: Vec<String>,
}

impl Favorites {
    pub fn from_ids(ids: Vec<String>) -> Self {
        let mut favs = Self::default();
        for id in ids {
            if !favs.contains(&id) {
                favs.ids.push(id);
            }
        }
        favs
    }

    pub fn load(store: &dyn KvStore) -> Self {
        match store::load_json::<Vec<String>>(store, store::KEY_FAVORITES) {
            Ok(Some(ids)) => Self::from_ids(ids),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("ignoring stored favorites: {}", e);
                Self::default()
            }
        }
    }

    pub fn persist(&self, store: &dyn KvStore) -> store::Result<()> {
        store::save_json(store, store::KEY_FAVORITES, &self.ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|f| f == id)
    }

    /// Add when absent, remove when present. Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(pos) = self.ids.iter().position(|f| f == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id.to_string());
            true
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|f| f != id);
        before != self.ids.len()
    }

    /// Shift a favorite by `offset` positions, clamped to the list bounds.
    pub fn move_by(&mut self, id: &str, offset: isize) -> bool {
        let Some(pos) = self.ids.iter().position(|f| f == id) else {
            return false;
        };
        let last = self.ids.len() as isize - 1;
        let target = (pos as isize + offset).clamp(0, last) as usize;
        if target == pos {
            return false;
        }
        let item = self.ids.remove(pos);
        self.ids.insert(target, item);
        true
    }
}
