use super::types::{GroupSubmission, IdeaInput};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_CREATOR_ID_LEN: usize = 128;
pub const MAX_IDEAS_PER_GROUP: usize = 100;

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate the owner token presented on a mutation.
pub fn validate_creator_id(creator_id: &str) -> Option<String> {
    validate_required(creator_id, "Creator ID", MAX_CREATOR_ID_LEN)
}

/// Validate a whole group submission. Returns every problem found, empty when valid.
pub fn validate_submission(submission: &GroupSubmission) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(e) = validate_creator_id(&submission.creator_id) {
        errors.push(e);
    }

    if submission.ideas.is_empty() {
        errors.push("At least one idea is required".to_string());
    } else if submission.ideas.len() > MAX_IDEAS_PER_GROUP {
        errors.push(format!("A group may hold at most {MAX_IDEAS_PER_GROUP} ideas"));
    }

    for (index, idea) in submission.ideas.iter().enumerate() {
        let n = index + 1;
        if let Some(e) = validate_required(&idea.title, &format!("Idea {n} title"), MAX_TITLE_LEN) {
            errors.push(e);
        }
        if let Some(e) = validate_required(
            &idea.description,
            &format!("Idea {n} description"),
            MAX_DESCRIPTION_LEN,
        ) {
            errors.push(e);
        }
    }

    errors
}

/// Trimmed copies of the submitted ideas, as they are stored.
pub fn normalize(ideas: &[IdeaInput]) -> Vec<IdeaInput> {
    ideas
        .iter()
        .map(|i| IdeaInput {
            title: i.title.trim().to_string(),
            description: i.description.trim().to_string(),
        })
        .collect()
}
