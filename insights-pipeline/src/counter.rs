use std::collections::HashMap;

/// Occurrence counter that remembers first-insertion order.
///
/// Iteration yields keys in the order they were first seen, and
/// `most_frequent` breaks ties in favor of the earliest key, so results
/// are reproducible for a fixed input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccurrenceCounter {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl OccurrenceCounter {
    pub fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Highest count; the first-inserted key wins a tie.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (key, count) in self.iter() {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((key, count)),
            }
        }
        best
    }
}
