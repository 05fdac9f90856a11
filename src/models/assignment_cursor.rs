use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-campaign round-robin pointer into the active assignee sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCursor {
    pub campaign_id: i64,
    pub current_index: i32,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignmentCursor {
    pub fn new(campaign_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            current_index: 0,
            last_assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to the next position, wrapping to 0 at `total_active`
    pub fn advance(&mut self, total_active: usize) {
        let next = self.position().map_or(0, |index| index + 1);
        self.current_index = if next >= total_active {
            0
        } else {
            i32::try_from(next).unwrap_or(0)
        };
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Reset to 0 when the pointer no longer fits the pool. Returns true if reset.
    pub fn heal(&mut self, pool_len: usize) -> bool {
        match self.position() {
            Some(index) if index < pool_len => false,
            _ => {
                self.reset();
                true
            }
        }
    }

    /// Entry the cursor currently points at
    pub fn select<'a, T>(&self, sequence: &'a [T]) -> Option<&'a T> {
        self.position().and_then(|index| sequence.get(index))
    }

    fn position(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor_at(index: i32) -> AssignmentCursor {
        let mut cursor = AssignmentCursor::new(1, Utc::now());
        cursor.current_index = index;
        cursor
    }

    #[test]
    fn test_advance_wraps_at_pool_size() {
        let mut cursor = cursor_at(1);
        cursor.advance(3);
        assert_eq!(cursor.current_index, 2);
        cursor.advance(3);
        assert_eq!(cursor.current_index, 0);
        cursor.advance(1);
        assert_eq!(cursor.current_index, 0);
    }

    #[test]
    fn test_advance_with_empty_pool_stays_at_zero() {
        let mut cursor = cursor_at(4);
        cursor.advance(0);
        assert_eq!(cursor.current_index, 0);
    }

    #[test]
    fn test_heal_resets_out_of_range_pointer() {
        let mut cursor = cursor_at(4);
        assert!(cursor.heal(2));
        assert_eq!(cursor.current_index, 0);

        let mut cursor = cursor_at(1);
        assert!(!cursor.heal(2));
        assert_eq!(cursor.current_index, 1);

        let mut cursor = cursor_at(-3);
        assert!(cursor.heal(5));
        assert_eq!(cursor.current_index, 0);
    }

    #[test]
    fn test_select() {
        let pool = ["a", "b", "c"];
        assert_eq!(cursor_at(2).select(&pool), Some(&"c"));
        assert_eq!(cursor_at(3).select(&pool), None);
    }
}
