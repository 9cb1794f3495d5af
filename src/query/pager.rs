/// Clamped `[start, end)` window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Negative starts clamp to zero; inverted windows become empty.
    pub fn from_rows(start_row: i64, end_row: i64) -> Self {
        let offset = start_row.max(0);
        let limit = end_row.saturating_sub(offset).max(0);
        Self { offset, limit }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    /// Number of rows this window yields from `total` matches.
    pub fn len_within(&self, total: i64) -> i64 {
        let end = self.offset.saturating_add(self.limit).min(total);
        (end - self.offset.min(total)).max(0)
    }
}
