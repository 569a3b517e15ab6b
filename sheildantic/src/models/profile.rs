use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{rules, FieldKind, Model, Schema};

/// Public profile submitted through the demo API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(length(min = 1, max = 80, message = "Name must be 1-80 characters"))]
    pub name: String,
    #[validate(custom(function = "rules::validate_identifier"))]
    pub handle: String,
    #[serde(default)]
    pub friends: Vec<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: String,
    #[serde(default)]
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Model for Profile {
    fn schema() -> Schema {
        Schema::new()
            .required("name", FieldKind::String)
            .required("handle", FieldKind::String)
            .required("friends", FieldKind::list_of(FieldKind::Integer))
            .optional("active", FieldKind::Boolean)
            .optional("bio", FieldKind::String)
            .optional("website", FieldKind::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            name: "Ann".to_string(),
            handle: "ann_1".to_string(),
            friends: vec![],
            active: true,
            bio: String::new(),
            website: None,
        }
    }

    #[test]
    fn profile_accepts_minimal_payload() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn profile_rejects_bad_handle() {
        let payload = Profile {
            handle: "ann!".to_string(),
            ..profile()
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn profile_rejects_too_long_bio() {
        let payload = Profile {
            bio: "b".repeat(501),
            ..profile()
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn profile_schema_marks_friends_as_list() {
        let schema = Profile::schema();
        assert!(schema.list_fields().contains("friends"));
        assert_eq!(schema.get("bio").map(|f| f.required), Some(false));
    }
}
