//! Nickname collision retry.
//!
//! When the server reports the requested nickname as taken, a new
//! candidate is derived deterministically: the configured name is
//! truncated so the suffix fits the nick length budget, a separator and
//! first tag are appended, and every further collision replaces the
//! trailing tag with the next counter value as one hex digit. The
//! counter is bounded; running past the bound is a fatal condition, not
//! a retry.

/// Highest suffix counter value; one hex digit.
pub const NICK_SUFFIX_BOUND: i8 = 0xF;
/// Length budget for candidate nicknames (RFC 1459 nick length).
pub const NICK_MAX_LEN: usize = 9;
/// Separator between the truncated base and the tag.
pub const NICK_SEPARATOR: char = '_';
/// Tag used by the first retry, before the counter starts.
pub const NICK_FIRST_TAG: char = 'X';

/// Candidate nickname generator for one logical connection attempt.
///
/// The counter starts unset (-1) and only ever increases until
/// [`NickAllocator::reset`]; collision-driven reconnects share one
/// allocator, fresh attempts reset it.
#[derive(Debug, Clone)]
pub struct NickAllocator {
    base: String,
    counter: i8,
}

impl NickAllocator {
    pub fn new(base: &str) -> Self {
        NickAllocator {
            base: base.to_string(),
            counter: -1,
        }
    }

    /// The configured name, before any collision handling.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn counter(&self) -> i8 {
        self.counter
    }

    /// Back to the unset state for a fresh connection attempt.
    pub fn reset(&mut self) {
        self.counter = -1;
    }

    /// The truncated stem all candidates share: base cut to leave room
    /// for the separator and one tag character.
    fn stem(&self) -> &str {
        let cut = NICK_MAX_LEN - 2;
        match self.base.char_indices().nth(cut) {
            Some((index, _)) => &self.base[..index],
            None => &self.base,
        }
    }

    /// Next candidate after a collision, or `None` once the counter
    /// bound is exhausted.
    pub fn next_candidate(&mut self) -> Option<String> {
        if self.counter < 0 {
            self.counter = 0;
            return Some(format!("{}{}{}", self.stem(), NICK_SEPARATOR, NICK_FIRST_TAG));
        }
        if self.counter >= NICK_SUFFIX_BOUND {
            return None;
        }
        self.counter += 1;
        Some(format!(
            "{}{}{:X}",
            self.stem(),
            NICK_SEPARATOR,
            self.counter
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_collision_appends_separator_and_tag() {
        let mut nick = NickAllocator::new("omega");
        assert_eq!(nick.next_candidate().unwrap(), "omega_X");
        assert_eq!(nick.counter(), 0);
    }

    #[test]
    fn test_subsequent_collisions_count_in_hex() {
        let mut nick = NickAllocator::new("omega");
        nick.next_candidate().unwrap();
        assert_eq!(nick.next_candidate().unwrap(), "omega_1");
        assert_eq!(nick.next_candidate().unwrap(), "omega_2");
        for _ in 0..7 {
            nick.next_candidate().unwrap();
        }
        assert_eq!(nick.next_candidate().unwrap(), "omega_A");
    }

    #[test]
    fn test_long_names_are_truncated_to_budget() {
        let mut nick = NickAllocator::new("methuselah");
        let candidate = nick.next_candidate().unwrap();
        assert_eq!(candidate, "methuse_X");
        assert_eq!(candidate.len(), NICK_MAX_LEN);
        assert_eq!(nick.next_candidate().unwrap(), "methuse_1");
    }

    #[test]
    fn test_every_candidate_differs_and_counter_increases() {
        let mut nick = NickAllocator::new("omega");
        let mut seen = Vec::new();
        let mut last_counter = nick.counter();
        while let Some(candidate) = nick.next_candidate() {
            assert!(!seen.contains(&candidate));
            assert!(nick.counter() > last_counter);
            last_counter = nick.counter();
            seen.push(candidate);
        }
        // One first tag plus hex digits 1..F.
        assert_eq!(seen.len(), 16);
        assert_eq!(seen.last().unwrap(), "omega_F");
        assert_eq!(nick.counter(), NICK_SUFFIX_BOUND);
    }

    #[test]
    fn test_exhaustion_is_sticky_until_reset() {
        let mut nick = NickAllocator::new("omega");
        while nick.next_candidate().is_some() {}
        assert_eq!(nick.next_candidate(), None);
        assert_eq!(nick.next_candidate(), None);

        nick.reset();
        assert_eq!(nick.next_candidate().unwrap(), "omega_X");
    }
}
