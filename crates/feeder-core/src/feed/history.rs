// ── Bounded most-recent-first visit history ──

use std::collections::VecDeque;

use super::record::VisitRecord;

/// Most-recent-first list of visit records with a fixed capacity.
///
/// Inserting into a full history evicts the oldest record first, so the
/// length never exceeds the capacity. A capacity of zero is raised to one.
#[derive(Debug, Clone)]
pub struct VisitHistory {
    records: VecDeque<VisitRecord>,
    capacity: usize,
}

impl VisitHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Evict the oldest record if full, then prepend.
    pub fn push(&mut self, record: VisitRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &VisitRecord> {
        self.records.iter()
    }

    /// Owned newest-first copy for publishing to renderers.
    pub fn snapshot(&self) -> Vec<VisitRecord> {
        self.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(n: usize) -> VisitRecord {
        VisitRecord::new(format!("bird{n}"), format!("t{n}"))
    }

    fn species(history: &VisitHistory) -> Vec<String> {
        history.iter().map(|r| r.species().to_owned()).collect()
    }

    #[test]
    fn keeps_last_n_newest_first() {
        let mut history = VisitHistory::new(5);
        for n in 1..=7 {
            history.push(rec(n));
        }
        assert_eq!(history.len(), 5);
        assert_eq!(species(&history), ["bird7", "bird6", "bird5", "bird4", "bird3"]);
    }

    #[test]
    fn fewer_than_capacity_are_all_kept() {
        let mut history = VisitHistory::new(5);
        history.push(rec(1));
        history.push(rec(2));
        assert_eq!(species(&history), ["bird2", "bird1"]);
    }

    #[test]
    fn full_history_evicts_exactly_the_oldest() {
        let mut history = VisitHistory::new(3);
        for n in 1..=3 {
            history.push(rec(n));
        }
        history.push(rec(4));
        assert_eq!(species(&history), ["bird4", "bird3", "bird2"]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = VisitHistory::new(0);
        history.push(rec(1));
        history.push(rec(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(species(&history), ["bird2"]);
    }

    #[test]
    fn clear_empties() {
        let mut history = VisitHistory::new(5);
        history.push(rec(1));
        history.clear();
        assert!(history.is_empty());
        assert!(history.snapshot().is_empty());
    }
}
