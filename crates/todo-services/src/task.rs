//! Task documents and the form values used to create or edit them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_weather::{Location, Weather, WeatherCategory};

use crate::task_backend::{validate_content, TaskBackendError, TaskBackendResult};

/// A single to-do item.
///
/// `marked_as_done_at` doubles as the status: `None` means active, any
/// timestamp means finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub location: Location,
    pub weather: Option<Weather>,
    pub created_at: DateTime<Utc>,
    pub marked_as_done_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.marked_as_done_at.is_none()
    }

    pub fn status(&self) -> TaskStatus {
        if self.is_active() {
            TaskStatus::Active
        } else {
            TaskStatus::Finished
        }
    }

    /// Display category from the latest weather reading.
    pub fn category(&self) -> WeatherCategory {
        WeatherCategory::classify(self.weather.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Finished,
}

/// Tasks split the way the list page shows them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskLists {
    /// Newest first
    pub active: Vec<Task>,
    /// Most recently finished first
    pub finished: Vec<Task>,
}

impl TaskLists {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.finished.is_empty()
    }
}

/// Raw values submitted by the create/edit form.
///
/// `location` is kept as a JSON value because the field arrives from the
/// client untyped; anything but a `"<lat>::<lon>::<label>"` string is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub location: serde_json::Value,
}

impl TaskForm {
    pub fn new(content: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            location: serde_json::Value::String(location.into()),
        }
    }

    /// Validate the form and return the cleaned content and parsed location.
    ///
    /// # Errors
    /// Returns `TaskBackendError::Validation` naming the offending field.
    pub fn validate(&self) -> TaskBackendResult<(String, Location)> {
        validate_content(&self.content)?;

        let location = Location::from_form_value(&self.location)
            .ok_or_else(|| TaskBackendError::validation("location", "The value is incorrect."))?;

        Ok((self.content.clone(), location))
    }
}
