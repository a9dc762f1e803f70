use thiserror::Error;
use time::{Duration, PrimitiveDateTime};

use crate::db::types::QuizStatus;

/// Submissions are still accepted this long after the end time.
pub(crate) const SUBMISSION_GRACE: Duration = Duration::seconds(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum WindowError {
    #[error("Quiz has not started yet.")]
    NotStarted,
    #[error("Quiz has ended.")]
    Ended,
}

pub(crate) fn status(
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> QuizStatus {
    if now < start {
        QuizStatus::Upcoming
    } else if now > end {
        QuizStatus::Finished
    } else {
        QuizStatus::Live
    }
}

/// A quiz can be opened only while it is live.
pub(crate) fn ensure_open(
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<(), WindowError> {
    match status(start, end, now) {
        QuizStatus::Upcoming => Err(WindowError::NotStarted),
        QuizStatus::Finished => Err(WindowError::Ended),
        QuizStatus::Live => Ok(()),
    }
}

pub(crate) fn ensure_accepting_submissions(
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<(), WindowError> {
    ensure_open(start, end + SUBMISSION_GRACE, now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct StatusCounts {
    pub(crate) upcoming: i64,
    pub(crate) live: i64,
    pub(crate) finished: i64,
}

pub(crate) fn count_statuses(
    windows: &[(PrimitiveDateTime, PrimitiveDateTime)],
    now: PrimitiveDateTime,
) -> StatusCounts {
    windows.iter().fold(StatusCounts::default(), |mut counts, (start, end)| {
        match status(*start, *end, now) {
            QuizStatus::Upcoming => counts.upcoming += 1,
            QuizStatus::Live => counts.live += 1,
            QuizStatus::Finished => counts.finished += 1,
        }
        counts
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const START: PrimitiveDateTime = datetime!(2025-03-01 09:00);
    const END: PrimitiveDateTime = datetime!(2025-03-01 10:00);

    #[test]
    fn status_boundaries_are_inclusive() {
        assert_eq!(status(START, END, datetime!(2025-03-01 08:59:59)), QuizStatus::Upcoming);
        assert_eq!(status(START, END, START), QuizStatus::Live);
        assert_eq!(status(START, END, END), QuizStatus::Live);
        assert_eq!(status(START, END, datetime!(2025-03-01 10:00:01)), QuizStatus::Finished);
    }

    #[test]
    fn opening_outside_window_fails_with_reason() {
        assert_eq!(
            ensure_open(START, END, datetime!(2025-03-01 08:00)),
            Err(WindowError::NotStarted)
        );
        assert_eq!(ensure_open(START, END, datetime!(2025-03-01 11:00)), Err(WindowError::Ended));
        assert_eq!(WindowError::NotStarted.to_string(), "Quiz has not started yet.");
    }

    #[test]
    fn submissions_get_a_grace_period() {
        assert!(ensure_accepting_submissions(START, END, datetime!(2025-03-01 10:00:59)).is_ok());
        assert_eq!(
            ensure_accepting_submissions(START, END, datetime!(2025-03-01 10:01:01)),
            Err(WindowError::Ended)
        );
    }

    #[test]
    fn counts_each_status() {
        let windows = vec![
            (START, END),
            (datetime!(2025-03-02 09:00), datetime!(2025-03-02 10:00)),
            (datetime!(2025-02-01 09:00), datetime!(2025-02-01 10:00)),
            (datetime!(2025-02-02 09:00), datetime!(2025-02-02 10:00)),
        ];
        let counts = count_statuses(&windows, datetime!(2025-03-01 09:30));
        assert_eq!(counts, StatusCounts { upcoming: 1, live: 1, finished: 2 });
    }
}
