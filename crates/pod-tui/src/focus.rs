//! FocusRing: keyboard focus across the three panes.

use crate::session::Pane;

pub struct FocusRing {
    items: Vec<Pane>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<Pane>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Pane {
        self.items.get(self.current).copied().unwrap_or_default()
    }

    /// Tab: wraps around.
    pub fn next(&mut self) -> Pane {
        if !self.items.is_empty() {
            self.current = (self.current + 1) % self.items.len();
        }
        self.current()
    }

    /// Right arrow: stops at the last pane.
    pub fn step_right(&mut self) -> Pane {
        if self.current + 1 < self.items.len() {
            self.current += 1;
        }
        self.current()
    }

    /// Left arrow: stops at the first pane.
    pub fn step_left(&mut self) -> Pane {
        self.current = self.current.saturating_sub(1);
        self.current()
    }

    pub fn set(&mut self, pane: Pane) {
        if let Some(pos) = self.items.iter().position(|&x| x == pane) {
            self.current = pos;
        }
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(vec![Pane::Catalog, Pane::Episodes, Pane::Detail])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_wraps_but_arrows_stop() {
        let mut ring = FocusRing::default();
        assert_eq!(ring.next(), Pane::Episodes);
        assert_eq!(ring.next(), Pane::Detail);
        assert_eq!(ring.next(), Pane::Catalog);

        assert_eq!(ring.step_left(), Pane::Catalog);
        assert_eq!(ring.step_right(), Pane::Episodes);
        assert_eq!(ring.step_right(), Pane::Detail);
        assert_eq!(ring.step_right(), Pane::Detail);
    }
}
