use serde_json::{Map, Value};

/// A single rule violation, reported against the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Error returned when an input record does not satisfy the task schema.
///
/// Displays as the message of the first violated field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Builds a validation error from a non-empty list of violations.
    fn from_errors(errors: Vec<FieldError>) -> Self {
        let message = errors
            .first()
            .map(|error| error.message.clone())
            .unwrap_or_else(|| "Invalid input".to_string());
        Self { message, errors }
    }

    /// Builds a validation error for a single field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self::from_errors(vec![FieldError::new(field, message)])
    }

    /// Returns every violation, in field declaration order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

/// Validated input for creating a task. `title` is trimmed but not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub color: String,
    pub completed: bool,
}

/// Validated partial input for updating a task. Absent fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub color: Option<String>,
    pub completed: Option<bool>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.color.is_none() && self.completed.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text { allow_empty: bool },
    Flag,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
}

const TASK_RULES: [FieldRule; 3] = [
    FieldRule {
        name: "title",
        label: "Title",
        kind: FieldKind::Text { allow_empty: false },
        required: true,
    },
    FieldRule {
        name: "color",
        label: "Color",
        kind: FieldKind::Text { allow_empty: true },
        required: true,
    },
    FieldRule {
        name: "completed",
        label: "Completed",
        kind: FieldKind::Flag,
        required: false,
    },
];

impl FieldRule {
    fn check(&self, record: &Map<String, Value>, partial: bool) -> Option<FieldError> {
        let Some(value) = record.get(self.name) else {
            return (self.required && !partial)
                .then(|| FieldError::new(self.name, format!("{} is required", self.label)));
        };

        match (self.kind, value) {
            (FieldKind::Text { allow_empty }, Value::String(text)) => {
                (!allow_empty && text.trim().is_empty())
                    .then(|| FieldError::new(self.name, format!("{} cannot be empty", self.label)))
            }
            (FieldKind::Text { .. }, _) => Some(FieldError::new(
                self.name,
                format!("{} must be a string", self.label),
            )),
            (FieldKind::Flag, Value::Bool(_)) => None,
            (FieldKind::Flag, _) => Some(FieldError::new(
                self.name,
                format!("{} must be a boolean", self.label),
            )),
        }
    }
}

fn as_record(input: &Value) -> Result<&Map<String, Value>, ValidationError> {
    input
        .as_object()
        .ok_or_else(|| ValidationError::single("body", "Request body must be a JSON object"))
}

fn check_record(record: &Map<String, Value>, partial: bool) -> Result<(), ValidationError> {
    let errors: Vec<FieldError> = TASK_RULES
        .iter()
        .filter_map(|rule| rule.check(record, partial))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::from_errors(errors))
    }
}

fn text(record: &Map<String, Value>, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string())
}

fn flag(record: &Map<String, Value>, field: &str) -> Option<bool> {
    record.get(field).and_then(Value::as_bool)
}

/// Validates a full task record, as required on creation.
///
/// Unknown fields are ignored. `completed` defaults to `false`.
pub fn validate_new_task(input: &Value) -> Result<NewTask, ValidationError> {
    let record = as_record(input)?;
    check_record(record, false)?;

    match (text(record, "title"), text(record, "color")) {
        (Some(title), Some(color)) => Ok(NewTask {
            title,
            color,
            completed: flag(record, "completed").unwrap_or(false),
        }),
        _ => Err(ValidationError::single("body", "Invalid input")),
    }
}

/// Validates any subset of task fields, as allowed on update.
pub fn validate_task_changes(input: &Value) -> Result<TaskChanges, ValidationError> {
    let record = as_record(input)?;
    check_record(record, true)?;

    Ok(TaskChanges {
        title: text(record, "title"),
        color: text(record, "color"),
        completed: flag(record, "completed"),
    })
}
