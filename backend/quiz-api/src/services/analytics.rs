use crate::models::{
    dashboard::{DashboardSummary, RecentQuiz, TrendPoint},
    QuizResult,
};

/// Number of attempts plotted on the trend chart.
pub const TREND_WINDOW: usize = 10;

/// `round(100 * score / total)`, rounding halves up. Integer arithmetic only.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score);
    let total = u64::from(total);
    ((200 * score + total) / (2 * total)) as u32
}

/// Mean of the per-entry percentages, rounded half up. Empty history is 0.
pub fn average_percentage(history: &[QuizResult]) -> u32 {
    if history.is_empty() {
        return 0;
    }
    let sum: u64 = history
        .iter()
        .map(|r| u64::from(percentage(r.score, r.total)))
        .sum();
    let len = history.len() as u64;
    ((2 * sum + len) / (2 * len)) as u32
}

/// Last [`TREND_WINDOW`] attempts in chronological order, labelled from "Quiz 1".
pub fn trend(history: &[QuizResult]) -> Vec<TrendPoint> {
    let chronological: Vec<&QuizResult> = history.iter().rev().collect();
    let start = chronological.len().saturating_sub(TREND_WINDOW);

    chronological[start..]
        .iter()
        .enumerate()
        .map(|(i, r)| TrendPoint {
            label: format!("Quiz {}", i + 1),
            percentage: percentage(r.score, r.total),
            title: r.quiz_title.clone(),
        })
        .collect()
}

/// The whole history in stored (newest-first) order.
pub fn recent(history: &[QuizResult]) -> Vec<RecentQuiz> {
    history
        .iter()
        .map(|r| RecentQuiz {
            quiz_id: r.quiz_id.clone(),
            quiz_title: r.quiz_title.clone(),
            score: r.score,
            total: r.total,
            percentage: percentage(r.score, r.total),
            timestamp: r.timestamp,
        })
        .collect()
}

pub fn summarize(history: &[QuizResult]) -> DashboardSummary {
    DashboardSummary {
        average_percentage: average_percentage(history),
        total_quizzes: history.len(),
        trend: trend(history),
        recent: recent(history),
    }
}
