use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "gradingstatus", rename_all = "snake_case")]
pub enum GradingStatus {
    Pending,
    InProgress,
    Completed,
}

impl GradingStatus {
    /// Statuses advance pending -> in_progress -> completed and never move back.
    pub fn rank(self) -> u8 {
        match self {
            GradingStatus::Pending => 0,
            GradingStatus::InProgress => 1,
            GradingStatus::Completed => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
pub enum QuestionKind {
    Multiple,
    Essay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_status_ranks_are_monotonic() {
        assert!(GradingStatus::Pending.rank() < GradingStatus::InProgress.rank());
        assert!(GradingStatus::InProgress.rank() < GradingStatus::Completed.rank());
    }
}
