//! List model behind the station pane: a query narrows the items to a
//! visible subset, a cursor walks that subset and a window keeps the cursor
//! on screen.

type Matcher<T> = Box<dyn Fn(&T, &str) -> bool + Send + Sync>;

pub struct ScrollableList<T> {
    items: Vec<T>,
    /// Indices into `items` that pass the query, in item order.
    shown: Vec<usize>,
    /// Position within `shown`.
    cursor: usize,
    /// First row of the window.
    offset: usize,
    query: String,
    matcher: Matcher<T>,
}

impl<T> ScrollableList<T> {
    pub fn new(matcher: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Vec::new(),
            shown: Vec::new(),
            cursor: 0,
            offset: 0,
            query: String::new(),
            matcher: Box::new(matcher),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the items; the cursor stays at the same position, clamped.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.refilter();
    }

    /// Narrow to `query`. The item under the cursor stays selected when it
    /// still matches; otherwise the cursor returns to the top.
    pub fn set_filter(&mut self, query: &str) {
        let anchor = self.shown.get(self.cursor).copied();
        self.query = query.to_string();
        self.refilter();
        self.cursor = anchor
            .and_then(|a| self.shown.iter().position(|&i| i == a))
            .unwrap_or(0);
        self.offset = 0;
    }

    fn refilter(&mut self) {
        let query = self.query.as_str();
        let matcher = &self.matcher;
        self.shown = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.is_empty() || matcher(item, query))
            .map(|(i, _)| i)
            .collect();
        self.cursor = self.cursor.min(self.shown.len().saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        let last = self.shown.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    pub fn select_up(&mut self, n: usize) {
        self.move_cursor(-(n as isize));
    }

    pub fn select_down(&mut self, n: usize) {
        self.move_cursor(n as isize);
    }

    pub fn select_first(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    pub fn select_last(&mut self) {
        self.cursor = self.shown.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.shown.get(self.cursor).map(|&i| &self.items[i])
    }

    /// Put the cursor on the first shown item matching `pred`.
    pub fn select_where(&mut self, pred: impl Fn(&T) -> bool) -> bool {
        let Some(pos) = self.shown.iter().position(|&i| pred(&self.items[i])) else {
            return false;
        };
        self.cursor = pos;
        true
    }

    /// Slide the window so the cursor is inside `height` rows.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
    }

    /// Items inside the window, top to bottom.
    pub fn visible_items(&self, height: usize) -> impl Iterator<Item = &T> + '_ {
        self.shown
            .iter()
            .skip(self.offset)
            .take(height)
            .map(|&i| &self.items[i])
    }

    /// Row of the cursor inside the window.
    pub fn selected_in_view(&self, height: usize) -> usize {
        self.cursor
            .saturating_sub(self.offset)
            .min(height.saturating_sub(1))
    }

    /// Move the cursor to window row `row`; false when the row is empty.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.offset + row;
        if target >= self.shown.len() {
            return false;
        }
        self.cursor = target;
        true
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> ScrollableList<&'static str> {
        let mut list = ScrollableList::new(|s: &&str, q: &str| s.contains(q));
        list.set_items(vec!["alpha", "beta", "gamma", "delta", "epsilon"]);
        list
    }

    #[test]
    fn test_filter_keeps_selection_when_possible() {
        let mut list = names();
        list.select_down(3);
        list.set_filter("ta");
        assert_eq!(list.len(), 2);
        assert_eq!(list.selected_item(), Some(&"delta"));
        list.set_filter("zzz");
        assert!(list.is_empty());
        assert!(list.selected_item().is_none());
        list.set_filter("");
        assert_eq!(list.len(), 5);
        assert_eq!(list.selected_item(), Some(&"alpha"));
    }

    #[test]
    fn test_window_follows_cursor() {
        let mut list = names();
        list.select_last();
        list.ensure_visible(2);
        let window: Vec<_> = list.visible_items(2).copied().collect();
        assert_eq!(window, vec!["delta", "epsilon"]);
        assert_eq!(list.selected_in_view(2), 1);
        list.select_up(10);
        assert_eq!(list.selected_item(), Some(&"alpha"));
        list.ensure_visible(2);
        assert_eq!(list.visible_items(2).next(), Some(&"alpha"));
    }

    #[test]
    fn test_click_and_select_where() {
        let mut list = names();
        assert!(list.handle_click(2));
        assert_eq!(list.selected_item(), Some(&"gamma"));
        assert!(!list.handle_click(10));
        assert!(list.select_where(|s| *s == "epsilon"));
        assert_eq!(list.selected_item(), Some(&"epsilon"));
        assert!(!list.select_where(|s| *s == "omega"));
    }
}
