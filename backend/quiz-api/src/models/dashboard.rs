use serde::{Deserialize, Serialize};

/// One point of the performance chart, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub percentage: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentQuiz {
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub average_percentage: u32,
    pub total_quizzes: usize,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<RecentQuiz>,
}
