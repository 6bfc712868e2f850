use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Event,
    Appointment,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Work,
        Category::Personal,
        Category::Event,
        Category::Appointment,
    ];

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "work" => Some(Self::Work),
            "personal" => Some(Self::Personal),
            "event" => Some(Self::Event),
            "appointment" | "appt" => Some(Self::Appointment),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Event => "Event",
            Self::Appointment => "Appointment",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The central entity. The armed deadline for a task lives exclusively in
/// the `TimerRegistry` and is never part of this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,

    pub text: String,

    pub category: Category,

    pub due_at: DateTime<Utc>,

    #[serde(default)]
    pub done: bool,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

impl Task {
    pub fn new(
        text: String,
        category: Category,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            category,
            due_at,
            done: false,
            created: now,
            modified: now,
        }
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// Fields supplied by the caller when adding a task; validated by the
/// engine before any state change.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub text: String,
    pub category: Category,
    pub due_at: DateTime<Utc>,
}
