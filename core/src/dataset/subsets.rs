//! Enumeration of keyword subsets.

/// Iterator over every non-empty subset of `items`, smallest subsets first and
/// lexicographic (by position) within a size.
///
/// `items` should already be sorted and deduplicated; each yielded subset then
/// comes out sorted too.
pub struct Subsets<'a, T> {
    items: &'a [T],
    size: usize,
    /// Current combination as ascending indices into `items`.
    indices: Vec<usize>,
    done: bool,
}

impl<'a, T> Subsets<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            size: 1,
            indices: vec![0],
            done: items.is_empty(),
        }
    }

    /// Move `indices` to the next combination of the current size, or start
    /// the first combination of the next size.
    fn advance(&mut self) {
        let n = self.items.len();
        let k = self.size;

        // Rightmost position that can still be incremented.
        let pivot = (0..k).rev().find(|&i| self.indices[i] < n - k + i);
        match pivot {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None if k < n => {
                self.size += 1;
                self.indices = (0..self.size).collect();
            }
            None => self.done = true,
        }
    }
}

impl<'a, T> Iterator for Subsets<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let subset = self.indices.iter().map(|&i| &self.items[i]).collect();
        self.advance();
        Some(subset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        // Exact counts only matter for small inputs; stay conservative above.
        (1, None)
    }
}

/// Number of non-empty subsets of `k` items, saturating.
pub fn subset_count(k: usize) -> u128 {
    u32::try_from(k)
        .ok()
        .and_then(|k| 1u128.checked_shl(k))
        .map_or(u128::MAX, |n| n - 1)
}
