use chrono::{DateTime, Duration, Utc};

use crate::datetime::to_project_date;
use crate::task::{Category, Task};

#[derive(Debug, Clone, Copy)]
pub struct CategoryStats {
    pub category: Category,
    pub total: usize,
    pub completed: usize,
}

/// Summary counts over the current task set: overall progress, per-category
/// breakdown, and how many tasks land on today's / tomorrow's project date.
#[derive(Debug, Clone)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub per_category: Vec<CategoryStats>,
    pub due_today: usize,
    pub due_tomorrow: usize,
}

impl Stats {
    pub fn completion_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u32
    }
}

pub fn compute(tasks: &[&Task], now: DateTime<Utc>) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.done).count();

    let per_category = Category::ALL
        .iter()
        .map(|category| CategoryStats {
            category: *category,
            total: tasks.iter().filter(|t| t.category == *category).count(),
            completed: tasks
                .iter()
                .filter(|t| t.category == *category && t.done)
                .count(),
        })
        .collect();

    let today = to_project_date(now);
    let tomorrow = today + Duration::days(1);
    let due_today = tasks
        .iter()
        .filter(|t| to_project_date(t.due_at) == today)
        .count();
    let due_tomorrow = tasks
        .iter()
        .filter(|t| to_project_date(t.due_at) == tomorrow)
        .count();

    Stats {
        total,
        completed,
        incomplete: total - completed,
        per_category,
        due_today,
        due_tomorrow,
    }
}
