//! Focus and stacking order.
//!
//! Every focus change hands the target the next value of a monotonically
//! increasing counter. Once the counter reaches the threshold, the next focus
//! change compacts all live indices to `1..=n` (keeping their relative order)
//! and gives the target `n + 1`, so indices stay bounded however long the
//! session runs.

use std::collections::BTreeMap;
use std::time::Instant;

use super::{HeaderTone, Window, WindowId};

#[derive(Debug)]
pub struct ZOrder {
    current: Option<WindowId>,
    largest: u32,
    threshold: u32,
    seq: u64,
}

impl ZOrder {
    pub fn new(threshold: u32) -> Self {
        Self {
            current: None,
            largest: 0,
            threshold,
            seq: 0,
        }
    }

    pub fn current(&self) -> Option<&WindowId> {
        self.current.as_ref()
    }

    pub fn largest(&self) -> u32 {
        self.largest
    }

    /// Forget the focused pointer if it names `id`.
    pub(crate) fn forget(&mut self, id: &WindowId) -> bool {
        if self.current.as_ref() == Some(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Focus `target`, or the most recently focused window when `target` is
    /// `None`. Returns the id that gained focus, or `None` when nothing
    /// changed.
    pub fn focus(
        &mut self,
        windows: &mut BTreeMap<WindowId, Window>,
        target: Option<&WindowId>,
    ) -> Option<WindowId> {
        let target = match target {
            Some(id) if windows.contains_key(id) => id.clone(),
            Some(_) => return None,
            None => windows
                .values()
                .max_by_key(|window| window.state.recency())
                .map(|window| window.state.id.clone())?,
        };
        if self.current.as_ref() == Some(&target) {
            return None;
        }

        if self.largest < self.threshold {
            self.largest += 1;
            if let Some(window) = windows.get_mut(&target) {
                window.state.surface.z_index = Some(self.largest);
            }
        } else {
            self.renormalize(windows, &target);
        }

        for (id, window) in windows.iter_mut() {
            window.state.surface.tone = if *id == target {
                HeaderTone::Focused
            } else {
                HeaderTone::Unfocused
            };
        }

        self.seq += 1;
        if let Some(window) = windows.get_mut(&target) {
            window.state.last_focus = Instant::now();
            window.state.focus_seq = self.seq;
        }
        tracing::debug!(window_id = %target, z_index = self.largest, "focus changed");
        self.current = Some(target.clone());
        Some(target)
    }

    fn renormalize(&mut self, windows: &mut BTreeMap<WindowId, Window>, target: &WindowId) {
        let mut order: Vec<(Option<u32>, WindowId)> = windows
            .iter()
            .map(|(id, window)| (window.state.surface.z_index, id.clone()))
            .collect();
        // Stable: equal indices keep map order, unindexed windows go first.
        order.sort_by_key(|(z, _)| *z);

        let count = order.len() as u32;
        for (position, (_, id)) in order.iter().enumerate() {
            if let Some(window) = windows.get_mut(id) {
                window.state.surface.z_index = Some(position as u32 + 1);
            }
        }
        if let Some(window) = windows.get_mut(target) {
            window.state.surface.z_index = Some(count + 1);
        }
        self.largest = count + 1;
        tracing::info!(windows = count, largest = self.largest, "renormalized stacking indices");
    }
}

/// Ids from bottom to top of the stack.
pub fn stacking_order(windows: &BTreeMap<WindowId, Window>) -> Vec<WindowId> {
    let mut order: Vec<(Option<u32>, &WindowId)> = windows
        .iter()
        .map(|(id, window)| (window.state.surface.z_index, id))
        .collect();
    order.sort_by_key(|(z, _)| *z);
    order.into_iter().map(|(_, id)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::testing::bare_window;

    fn windows(ids: &[&str]) -> BTreeMap<WindowId, Window> {
        ids.iter()
            .map(|id| {
                let window = bare_window(id);
                (window.state.id.clone(), window)
            })
            .collect()
    }

    fn z(windows: &BTreeMap<WindowId, Window>, id: &WindowId) -> Option<u32> {
        windows[id].state.surface.z_index
    }

    #[test]
    fn focus_assigns_increasing_indices() {
        let mut map = windows(&["w_a_0", "w_a_1"]);
        let ids: Vec<WindowId> = map.keys().cloned().collect();
        let mut z_order = ZOrder::new(10_000);
        z_order.focus(&mut map, Some(&ids[0]));
        z_order.focus(&mut map, Some(&ids[1]));
        assert_eq!(z(&map, &ids[0]), Some(1));
        assert_eq!(z(&map, &ids[1]), Some(2));
        assert_eq!(map[&ids[1]].state.surface.tone, HeaderTone::Focused);
        assert_eq!(map[&ids[0]].state.surface.tone, HeaderTone::Unfocused);
    }

    #[test]
    fn refocusing_current_window_is_a_no_op() {
        let mut map = windows(&["w_a_0"]);
        let id = map.keys().next().cloned().expect("id");
        let mut z_order = ZOrder::new(10_000);
        assert!(z_order.focus(&mut map, Some(&id)).is_some());
        let stamp = map[&id].state.recency();
        assert!(z_order.focus(&mut map, Some(&id)).is_none());
        assert_eq!(map[&id].state.recency(), stamp);
        assert_eq!(z_order.largest(), 1);
    }

    #[test]
    fn unknown_target_is_ignored() {
        let mut map = windows(&["w_a_0"]);
        let mut z_order = ZOrder::new(10_000);
        let ghost = WindowId::compose("ghost", None, 0);
        assert!(z_order.focus(&mut map, Some(&ghost)).is_none());
        assert!(z_order.current().is_none());
    }

    #[test]
    fn renormalization_keeps_relative_order() {
        let mut map = windows(&["w_a_0", "w_b_0", "w_c_0", "w_d_0"]);
        let ids: Vec<WindowId> = map.keys().cloned().collect();
        let mut z_order = ZOrder::new(3);
        // Stack (bottom to top): c, a, b. d never focused.
        z_order.focus(&mut map, Some(&ids[2]));
        z_order.focus(&mut map, Some(&ids[0]));
        z_order.focus(&mut map, Some(&ids[1]));
        assert_eq!(z_order.largest(), 3);

        z_order.focus(&mut map, Some(&ids[2]));
        // d had no index and sorts first; c's old slot stays as a gap.
        assert_eq!(z(&map, &ids[3]), Some(1));
        assert_eq!(z(&map, &ids[0]), Some(3));
        assert_eq!(z(&map, &ids[1]), Some(4));
        assert_eq!(z(&map, &ids[2]), Some(5));
        assert_eq!(z_order.largest(), 5);
        assert_eq!(
            stacking_order(&map),
            vec![ids[3].clone(), ids[0].clone(), ids[1].clone(), ids[2].clone()]
        );
    }

    #[test]
    fn focus_none_picks_most_recent() {
        let mut map = windows(&["w_a_0", "w_b_0"]);
        let ids: Vec<WindowId> = map.keys().cloned().collect();
        let mut z_order = ZOrder::new(10_000);
        z_order.focus(&mut map, Some(&ids[1]));
        z_order.focus(&mut map, Some(&ids[0]));
        z_order.forget(&ids[0]);
        map.remove(&ids[0]);
        assert_eq!(z_order.focus(&mut map, None), Some(ids[1].clone()));
    }
}
