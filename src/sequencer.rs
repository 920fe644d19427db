use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub fn generate_permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }
    order
}

#[derive(Debug)]
pub struct Sequencer {
    shuffle_order: Vec<usize>,
    shuffle_cursor: Option<usize>,
    shuffle_rng: SmallRng,
    generation: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(shuffle_rng: SmallRng) -> Self {
        Self {
            shuffle_order: Vec::new(),
            shuffle_cursor: None,
            shuffle_rng,
            generation: 0,
        }
    }

    pub fn with_order(order: Vec<usize>) -> Self {
        let mut sequencer = Self::with_seed(0);
        sequencer.shuffle_order = order;
        sequencer.generation = 1;
        sequencer
    }

    pub fn order(&self) -> &[usize] {
        &self.shuffle_order
    }

    pub fn cursor(&self) -> Option<usize> {
        self.shuffle_cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_order(&self) -> bool {
        !self.shuffle_order.is_empty()
    }

    pub fn next(&mut self, current: usize, n: usize, shuffle: bool) -> Option<usize> {
        if n == 0 {
            return None;
        }
        if !shuffle {
            return Some((current + 1) % n);
        }
        if self.shuffle_order.len() != n {
            self.rebuild_shuffle_order(n);
            return self.shuffle_order.first().copied();
        }

        let len = self.shuffle_order.len();
        let cursor = self.shuffle_cursor.map_or(0, |cursor| (cursor + 1) % len);
        self.shuffle_cursor = Some(cursor);
        self.shuffle_order.get(cursor).copied()
    }

    pub fn previous(&mut self, current: usize, n: usize, shuffle: bool) -> Option<usize> {
        if n == 0 {
            return None;
        }
        if !shuffle {
            return Some((current % n + n - 1) % n);
        }
        // A blank state starts at the head of the new order, not its tail.
        if self.shuffle_order.len() != n {
            self.rebuild_shuffle_order(n);
            return self.shuffle_order.first().copied();
        }

        let len = self.shuffle_order.len();
        let cursor = self
            .shuffle_cursor
            .map_or(0, |cursor| (cursor + len - 1) % len);
        self.shuffle_cursor = Some(cursor);
        self.shuffle_order.get(cursor).copied()
    }

    /// Reconciles a jump that did not come from `next`/`previous`.
    ///
    /// Best effort only: an index missing from the order overwrites the slot
    /// under the cursor, so a later lap may visit some track twice.
    pub fn on_manual_select(&mut self, index: usize) {
        if self.shuffle_order.is_empty() {
            return;
        }
        if let Some(pos) = self.shuffle_order.iter().position(|idx| *idx == index) {
            self.shuffle_cursor = Some(pos);
            return;
        }

        let slot = self.shuffle_cursor.unwrap_or(0);
        self.shuffle_order[slot] = index;
        self.shuffle_cursor = Some(slot);
    }

    pub fn on_shuffle_toggle(&mut self, enabled: bool, n: usize) -> Option<usize> {
        if !enabled {
            self.clear();
            return None;
        }
        self.rebuild_shuffle_order(n);
        self.shuffle_order.first().copied()
    }

    pub fn on_track_count_change(&mut self, n: usize, shuffle: bool) {
        if shuffle {
            self.rebuild_shuffle_order(n);
        }
    }

    pub fn clear(&mut self) {
        self.shuffle_order.clear();
        self.shuffle_cursor = None;
    }

    fn rebuild_shuffle_order(&mut self, n: usize) {
        self.shuffle_order = generate_permutation(n, &mut self.shuffle_rng);
        self.shuffle_cursor = (n > 0).then_some(0);
        self.generation += 1;
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;
    use proptest::prop_assert_eq;
    use std::collections::HashSet;

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let unique: HashSet<usize> = order.iter().copied().collect();
        order.len() == n && unique.len() == n && order.iter().all(|idx| *idx < n)
    }

    #[test]
    fn trivial_permutations() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(generate_permutation(0, &mut rng).is_empty());
        assert_eq!(generate_permutation(1, &mut rng), vec![0]);
    }

    #[test]
    fn sequential_next_wraps() {
        let mut sequencer = Sequencer::with_seed(1);
        let mut current = 0;
        let mut visited = Vec::new();
        for _ in 0..3 {
            current = sequencer.next(current, 3, false).expect("next");
            visited.push(current);
        }
        assert_eq!(visited, vec![1, 2, 0]);
    }

    #[test]
    fn sequential_previous_wraps() {
        let mut sequencer = Sequencer::with_seed(1);
        assert_eq!(sequencer.previous(0, 3, false), Some(2));
        assert_eq!(sequencer.previous(2, 3, false), Some(1));
    }

    #[test]
    fn empty_playlist_has_no_next() {
        let mut sequencer = Sequencer::with_seed(1);
        assert_eq!(sequencer.next(0, 0, false), None);
        assert_eq!(sequencer.next(0, 0, true), None);
        assert_eq!(sequencer.previous(0, 0, true), None);
    }

    #[test]
    fn seeded_order_repeats_same_lap() {
        let mut sequencer = Sequencer::with_order(vec![2, 0, 3, 1]);
        let visited: Vec<usize> = (0..5)
            .map(|_| sequencer.next(0, 4, true).expect("next"))
            .collect();
        assert_eq!(visited, vec![2, 0, 3, 1, 2]);
        assert_eq!(sequencer.generation(), 1);
    }

    #[test]
    fn shuffle_visits_each_track_before_repeat() {
        let mut sequencer = Sequencer::with_seed(42);
        let first = sequencer.on_shuffle_toggle(true, 5).expect("first");
        let order = sequencer.order().to_vec();
        assert_eq!(order[0], first);

        let visited: Vec<usize> = (0..5)
            .map(|_| sequencer.next(first, 5, true).expect("next"))
            .collect();
        let unique: HashSet<usize> = visited.iter().copied().collect();
        assert_eq!(unique.len(), 5);

        let mut expected = order[1..].to_vec();
        expected.push(order[0]);
        assert_eq!(visited, expected);
    }

    #[test]
    fn stale_order_is_rebuilt_before_read() {
        let mut sequencer = Sequencer::with_order(vec![1, 0]);
        let next = sequencer.next(0, 4, true).expect("next");
        assert!(is_permutation(sequencer.order(), 4));
        assert_eq!(next, sequencer.order()[0]);
        assert_eq!(sequencer.cursor(), Some(0));
    }

    #[test]
    fn previous_from_blank_state_returns_head() {
        let mut sequencer = Sequencer::with_seed(9);
        let prev = sequencer.previous(0, 6, true).expect("previous");
        assert_eq!(prev, sequencer.order()[0]);
        assert_eq!(sequencer.cursor(), Some(0));
    }

    #[test]
    fn manual_select_moves_cursor_to_existing_slot() {
        let mut sequencer = Sequencer::with_order(vec![2, 0, 3, 1]);
        sequencer.next(0, 4, true);
        sequencer.next(2, 4, true);
        assert_eq!(sequencer.cursor(), Some(1));

        sequencer.on_manual_select(2);
        assert_eq!(sequencer.cursor(), Some(0));
        assert_eq!(sequencer.next(2, 4, true), Some(0));
    }

    #[test]
    fn manual_select_of_unknown_index_overwrites_cursor_slot() {
        let mut sequencer = Sequencer::with_order(vec![2, 0, 3, 1]);
        sequencer.next(0, 4, true);
        sequencer.next(2, 4, true);

        sequencer.on_manual_select(7);
        assert_eq!(sequencer.order(), &[2, 7, 3, 1]);
        assert_eq!(sequencer.order().len(), 4);
        assert_eq!(sequencer.cursor(), Some(1));
    }

    #[test]
    fn manual_select_without_order_is_ignored() {
        let mut sequencer = Sequencer::with_seed(3);
        sequencer.on_manual_select(2);
        assert!(!sequencer.has_order());
        assert_eq!(sequencer.cursor(), None);
    }

    #[test]
    fn disabling_shuffle_clears_order() {
        let mut sequencer = Sequencer::with_seed(3);
        sequencer.on_shuffle_toggle(true, 4);
        assert!(sequencer.has_order());

        assert_eq!(sequencer.on_shuffle_toggle(false, 4), None);
        assert!(!sequencer.has_order());
        assert_eq!(sequencer.cursor(), None);
        assert_eq!(sequencer.next(1, 4, false), Some(2));
    }

    #[test]
    fn count_change_always_regenerates() {
        let mut sequencer = Sequencer::with_seed(11);
        sequencer.on_shuffle_toggle(true, 8);
        sequencer.next(0, 8, true);
        let before = sequencer.generation();

        sequencer.on_track_count_change(8, true);
        assert_eq!(sequencer.generation(), before + 1);
        assert_eq!(sequencer.cursor(), Some(0));
        assert!(is_permutation(sequencer.order(), 8));
    }

    #[test]
    fn count_change_while_disabled_keeps_blank_state() {
        let mut sequencer = Sequencer::with_seed(11);
        sequencer.on_track_count_change(8, false);
        assert!(!sequencer.has_order());
        assert_eq!(sequencer.generation(), 0);
    }

    proptest::proptest! {
        #[test]
        fn permutation_covers_every_index(n in 1usize..200, seed in proptest::num::u64::ANY) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let order = generate_permutation(n, &mut rng);
            prop_assert!(is_permutation(&order, n));
        }

        #[test]
        fn sequential_next_cycles_back(n in 1usize..64, start in 0usize..64) {
            let start = start % n;
            let mut sequencer = Sequencer::with_seed(0);
            let mut current = start;
            let mut returns = 0;
            for _ in 0..n {
                current = sequencer.next(current, n, false).expect("next");
                if current == start {
                    returns += 1;
                }
            }
            prop_assert_eq!(returns, 1);
            prop_assert_eq!(current, start);
        }

        #[test]
        fn previous_undoes_next(
            n in 1usize..40,
            steps in 0usize..80,
            shuffle in proptest::bool::ANY,
            seed in proptest::num::u64::ANY,
        ) {
            let mut sequencer = Sequencer::with_seed(seed);
            let mut current = if shuffle {
                sequencer.on_shuffle_toggle(true, n).expect("first")
            } else {
                0
            };
            for _ in 0..steps {
                current = sequencer.next(current, n, shuffle).expect("next");
            }

            let cursor = sequencer.cursor();
            let advanced = sequencer.next(current, n, shuffle).expect("next");
            let back = sequencer.previous(advanced, n, shuffle).expect("previous");
            prop_assert_eq!(back, current);
            prop_assert_eq!(sequencer.cursor(), cursor);
        }

        #[test]
        fn shuffled_indices_stay_in_bounds(
            n in 1usize..32,
            ops in proptest::collection::vec(0u8..5, 1..200),
            seed in proptest::num::u64::ANY,
        ) {
            let mut sequencer = Sequencer::with_seed(seed);
            let mut shuffle = false;
            let mut current = 0;
            for op in ops {
                let step = match op {
                    0 => sequencer.next(current, n, shuffle),
                    1 => sequencer.previous(current, n, shuffle),
                    2 => {
                        shuffle = !shuffle;
                        sequencer.on_shuffle_toggle(shuffle, n)
                    }
                    3 => {
                        sequencer.on_manual_select(current);
                        None
                    }
                    _ => {
                        sequencer.on_track_count_change(n, shuffle);
                        None
                    }
                };
                if let Some(idx) = step {
                    prop_assert!(idx < n);
                    current = idx;
                }
                if shuffle {
                    prop_assert!(is_permutation(sequencer.order(), n));
                }
            }
        }
    }
}
