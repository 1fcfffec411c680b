//! FocusRing: keyboard focus cycling between the panes.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + self.items.len() - 1) % self.items.len();
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Add `id` to the ring (if absent) or drop it; focus stays put when
    /// possible.
    pub fn set_present(&mut self, id: ComponentId, present: bool) {
        let old = self.current();
        let pos = self.items.iter().position(|&x| x == id);
        match (present, pos) {
            (true, None) => self.items.push(id),
            (false, Some(p)) => {
                self.items.remove(p);
            }
            _ => return,
        }
        self.current = old
            .and_then(|o| self.items.iter().position(|&x| x == o))
            .unwrap_or(0);
    }

    /// Focus the Nth item (0-indexed). No-op if out of bounds.
    pub fn set_by_position(&mut self, pos: usize) -> Option<ComponentId> {
        if pos < self.items.len() {
            self.current = pos;
            self.current()
        } else {
            None
        }
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let mut ring = FocusRing::new(vec![ComponentId::StationList, ComponentId::Visualizer]);
        assert_eq!(ring.next(), Some(ComponentId::Visualizer));
        assert_eq!(ring.next(), Some(ComponentId::StationList));
        assert_eq!(ring.prev(), Some(ComponentId::Visualizer));
        assert!(ring.is_focused(ComponentId::Visualizer));
        assert_eq!(FocusRing::default().next(), None);
    }

    #[test]
    fn test_log_panel_joins_and_leaves() {
        let mut ring = FocusRing::new(vec![ComponentId::StationList, ComponentId::Visualizer]);
        ring.set(ComponentId::Visualizer);
        ring.set_present(ComponentId::LogPanel, true);
        assert!(ring.is_focused(ComponentId::Visualizer));
        assert_eq!(ring.set_by_position(2), Some(ComponentId::LogPanel));
        ring.set_present(ComponentId::LogPanel, false);
        assert_eq!(ring.current(), Some(ComponentId::StationList));
        assert_eq!(ring.set_by_position(5), None);
    }
}
