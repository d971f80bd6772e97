use crate::error::ValidationError;
use crate::store::QuestData;
use common::{
    QuestFields, EMAIL_MAX_CHARS, PASSWORD_MAX_CHARS, PASSWORD_MIN_CHARS,
    QUEST_CATEGORY_MAX_CHARS, QUEST_MAX_PARTICIPANTS_LIMIT, QUEST_TITLE_MAX_CHARS,
    QUEST_URL_MAX_CHARS, USERNAME_MAX_CHARS,
};

fn required_with_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length == 0 {
        return Err(ValidationError::new(field, "is required"));
    }
    if length < min || length > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    required_with_length("email", email, 1, EMAIL_MAX_CHARS)?;

    let malformed = || ValidationError::new("email", "is not a valid email address");
    if email.chars().any(char::is_whitespace) {
        return Err(malformed());
    }
    let (local, domain) = email.split_once('@').ok_or_else(malformed)?;
    if local.is_empty() || domain.contains('@') {
        return Err(malformed());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(malformed());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    required_with_length("password", password, PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS)
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    required_with_length("username", username.trim(), 1, USERNAME_MAX_CHARS)
}

/// Checks owner-supplied quest fields and normalizes them for storage.
pub fn validate_quest(fields: QuestFields) -> Result<QuestData, ValidationError> {
    let title = fields.title.trim().to_owned();
    required_with_length("title", &title, 1, QUEST_TITLE_MAX_CHARS)?;

    let category = fields.category.trim().to_owned();
    required_with_length("category", &category, 1, QUEST_CATEGORY_MAX_CHARS)?;

    if fields.max_participants < 1 {
        return Err(ValidationError::new(
            "max_participants",
            "must be at least 1",
        ));
    }
    if fields.max_participants > QUEST_MAX_PARTICIPANTS_LIMIT {
        return Err(ValidationError::new(
            "max_participants",
            format!("must not exceed {QUEST_MAX_PARTICIPANTS_LIMIT}"),
        ));
    }

    let deadline = fields
        .deadline
        .ok_or_else(|| ValidationError::new("deadline", "is required"))?;

    if let (Some(start), Some(end)) = (fields.start_time, fields.end_time) {
        if end < start {
            return Err(ValidationError::new(
                "end_time",
                "must not be earlier than start_time",
            ));
        }
    }

    let url = fields
        .url
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty());
    if let Some(url) = &url {
        if url.chars().count() > QUEST_URL_MAX_CHARS {
            return Err(ValidationError::new(
                "url",
                format!("must not exceed {QUEST_URL_MAX_CHARS} characters"),
            ));
        }
    }

    Ok(QuestData {
        title,
        description: fields.description,
        category,
        max_participants: fields.max_participants as u32,
        deadline,
        start_time: fields.start_time,
        end_time: fields.end_time,
        image: fields.image.filter(|image| !image.is_empty()),
        url,
    })
}
