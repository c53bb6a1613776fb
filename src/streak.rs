use chrono::NaiveDate;

use crate::models::StreakState;

/// Applies one activity day to a key's streak counters. Both the online
/// updater and the backfill replay go through this function; the rule lives
/// nowhere else.
///
/// Events dated on or before the recorded last-active day leave the state
/// unchanged: same-day duplicates are already counted, and out-of-order
/// events are dropped.
pub fn advance(state: Option<&StreakState>, day: NaiveDate) -> StreakState {
    let Some(state) = state else {
        return StreakState {
            current_streak: 1,
            longest_streak: 1,
            last_active_date: Some(day),
        };
    };

    let Some(last_active) = state.last_active_date else {
        return StreakState {
            current_streak: 1,
            longest_streak: state.longest_streak.max(1),
            last_active_date: Some(day),
        };
    };

    let current = match (day - last_active).num_days() {
        diff if diff <= 0 => return state.clone(),
        1 => state.current_streak + 1,
        _ => 1,
    };

    StreakState {
        current_streak: current,
        longest_streak: state.longest_streak.max(current),
        last_active_date: Some(day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, n).unwrap()
    }

    fn apply_days(days: &[u32]) -> StreakState {
        let mut state: Option<StreakState> = None;
        for n in days {
            state = Some(advance(state.as_ref(), day(*n)));
        }
        state.unwrap()
    }

    #[test]
    fn first_event_starts_a_streak() {
        let state = advance(None, day(5));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 1);
        assert_eq!(state.last_active_date, Some(day(5)));
    }

    #[test]
    fn unset_last_active_date_restarts_from_one() {
        let dormant = StreakState {
            current_streak: 0,
            longest_streak: 4,
            last_active_date: None,
        };
        let state = advance(Some(&dormant), day(10));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 4);
        assert_eq!(state.last_active_date, Some(day(10)));
    }

    #[test]
    fn consecutive_days_extend_the_run() {
        let state = apply_days(&[1, 2, 3]);
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.longest_streak, 3);
        assert_eq!(state.last_active_date, Some(day(3)));
    }

    #[test]
    fn same_day_duplicates_are_idempotent() {
        let once = apply_days(&[1, 2]);
        let twice = advance(Some(&once), day(2));
        assert_eq!(twice, once);
    }

    #[test]
    fn out_of_order_event_is_a_no_op() {
        let state = apply_days(&[4, 5]);
        let replayed = advance(Some(&state), day(2));
        assert_eq!(replayed, state);
    }

    #[test]
    fn gap_resets_current_but_keeps_longest() {
        let state = apply_days(&[1, 2, 3, 6]);
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 3);
        assert_eq!(state.last_active_date, Some(day(6)));
    }

    #[test]
    fn longest_never_decreases() {
        let days = [1, 2, 3, 7, 8, 9, 10, 20];
        let mut state: Option<StreakState> = None;
        let mut longest_so_far = 0;
        for n in days {
            state = Some(advance(state.as_ref(), day(n)));
            let longest = state.as_ref().unwrap().longest_streak;
            assert!(longest >= longest_so_far);
            longest_so_far = longest;
        }
        assert_eq!(longest_so_far, 4);
    }

    #[test]
    fn current_never_exceeds_longest() {
        let mut state: Option<StreakState> = None;
        for n in [1, 2, 5, 6, 7, 8, 15, 16] {
            state = Some(advance(state.as_ref(), day(n)));
            let state = state.as_ref().unwrap();
            assert!(state.current_streak <= state.longest_streak);
        }
    }
}
