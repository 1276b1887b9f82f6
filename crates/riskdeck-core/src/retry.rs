//! Bounded probing over a lazily generated sequence of candidates.
//!
//! Used for sources that publish on some days only: start at the most recent candidate, step
//! backward, stop at the first attempt that yields a value.

use std::fmt::Debug;
use std::future::Future;
use std::iter;

use time::Date;
use tracing::debug;

/// Successful probe: the winning candidate, its zero-based offset and the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Found<C, T> {
    pub candidate: C,
    pub offset: u32,
    pub value: T,
}

impl<C, T> Found<C, T> {
    /// Attempts made, including the successful one.
    pub const fn attempts(&self) -> u32 {
        self.offset + 1
    }
}

/// Every candidate was tried without success.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    /// The most recent attempt error, if the last failures were errors rather than empty results.
    pub last_error: Option<E>,
}

/// A walk of at most `max_attempts` candidates produced by repeatedly applying `step`.
#[derive(Debug, Clone)]
pub struct ProbeWalk<C, S> {
    start: C,
    step: S,
    max_attempts: u32,
}

impl<C, S> ProbeWalk<C, S>
where
    C: Clone + Debug,
    S: Fn(&C) -> Option<C>,
{
    pub fn new(start: C, step: S, max_attempts: u32) -> Self {
        Self {
            start,
            step,
            max_attempts,
        }
    }

    /// Candidates in probing order. Generated lazily; the walk ends early if `step` does.
    pub fn candidates(&self) -> impl Iterator<Item = C> + '_ {
        iter::successors(Some(self.start.clone()), |current| (self.step)(current))
            .take(self.max_attempts as usize)
    }

    /// Run `attempt` on each candidate in order until one returns `Ok(Some(_))`.
    ///
    /// `Ok(None)` (nothing published) and `Err(_)` both move on to the next candidate.
    /// Attempts never overlap: each future is driven to completion before the next starts.
    pub async fn first_success<T, E, F, Fut>(&self, mut attempt: F) -> Result<Found<C, T>, Exhausted<E>>
    where
        E: Debug,
        F: FnMut(u32, C) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let mut attempts = 0;
        let mut last_error = None;

        for (offset, candidate) in (0u32..).zip(self.candidates()) {
            attempts += 1;
            match attempt(offset, candidate.clone()).await {
                Ok(Some(value)) => {
                    return Ok(Found {
                        candidate,
                        offset,
                        value,
                    });
                }
                Ok(None) => {
                    debug!(offset, ?candidate, "probe empty");
                    last_error = None;
                }
                Err(error) => {
                    debug!(offset, ?candidate, ?error, "probe failed");
                    last_error = Some(error);
                }
            }
        }

        Err(Exhausted {
            attempts,
            last_error,
        })
    }
}

/// `today`, then each previous calendar day, `max_attempts` days in total.
pub fn backward_days(today: Date, max_attempts: u32) -> ProbeWalk<Date, fn(&Date) -> Option<Date>> {
    let step: fn(&Date) -> Option<Date> = |date| date.previous_day();
    ProbeWalk::new(today, step, max_attempts)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use time::macros::date;

    use super::*;

    #[test]
    fn backward_days_walks_across_month_boundary() {
        let walk = backward_days(date!(2024 - 03 - 02), 4);
        let days: Vec<Date> = walk.candidates().collect();
        assert_eq!(
            days,
            vec![
                date!(2024 - 03 - 02),
                date!(2024 - 03 - 01),
                date!(2024 - 02 - 29),
                date!(2024 - 02 - 28),
            ]
        );
    }

    #[test]
    fn walk_stops_when_step_runs_out() {
        let walk = ProbeWalk::new(2u32, |n: &u32| n.checked_sub(1), 10);
        assert_eq!(walk.candidates().collect::<Vec<_>>(), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn first_success_stops_probing() {
        let seen = RefCell::new(Vec::new());
        let walk = ProbeWalk::new(0u32, |n: &u32| Some(n + 1), 10);

        let found = walk
            .first_success(|offset, candidate| {
                seen.borrow_mut().push(offset);
                async move {
                    if candidate == 2 {
                        Ok::<_, String>(Some("hit"))
                    } else {
                        Ok(None)
                    }
                }
            })
            .await
            .expect("third candidate succeeds");

        assert_eq!(found.value, "hit");
        assert_eq!(found.attempts(), 3);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn exhaustion_keeps_trailing_error() {
        let walk = ProbeWalk::new(0u32, |n: &u32| Some(n + 1), 3);

        let exhausted = walk
            .first_success(|offset, _| async move {
                if offset == 2 {
                    Err::<Option<()>, _>("boom")
                } else {
                    Ok(None)
                }
            })
            .await
            .expect_err("nothing succeeds");

        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, Some("boom"));
    }
}
