use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Image extensions a post location may point at (compared case-insensitively).
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "gif", "svg"];

// --- Stored records ---

/// Post
///
/// A stored post, as returned by `/getPost` and `/list`. Maps onto the `posts`
/// table; the `post_id` column is a `BIGINT`, hence the `try_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[sqlx(rename = "post_id", try_from = "i64")]
    pub id: u64,
    pub author: String,
    pub headline: String,
    pub content: String,
    pub location: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

/// NewPost
///
/// The create intent sent from the gateway to the post service. The author is
/// always the authenticated login; the id is assigned by the post service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub author: String,
    pub headline: String,
    pub content: String,
    pub location: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    pub fn with_id(self, id: u64) -> Post {
        Post {
            id,
            author: self.author,
            headline: self.headline,
            content: self.content,
            location: self.location,
            value: self.value,
            created_at: self.created_at,
        }
    }
}

// --- Request payloads ---

/// Credentials
///
/// Body of both `POST /register` and `POST /auth`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct Credentials {
    #[validate(length(max = 50, message = "Login must be at most 50 characters"))]
    #[schema(example = "alice")]
    pub login: String,
    #[validate(length(max = 120, message = "Password must be at most 120 characters"))]
    pub password: String,
}

/// CreatePostRequest
///
/// Body of `POST /create`. The author is never part of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePostRequest {
    #[validate(length(max = 100, message = "Headline must be at most 100 characters"))]
    pub headline: String,
    #[validate(length(max = 3000, message = "Content must be at most 3000 characters"))]
    pub content: String,
    #[validate(
        length(max = 250, message = "Location must be at most 250 characters"),
        custom(function = "supported_image_location")
    )]
    #[schema(example = "photos/cat.png")]
    pub location: String,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct PostIdRequest {
    pub id: u64,
}

// --- Responses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostIdResponse {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostList {
    pub posts: Vec<Post>,
}

/// Rejects locations whose extension is not a supported image format. The
/// extension is whatever follows the last `.` of the final `/` segment, so
/// `".png"` counts and `"a.png/"` does not.
pub fn supported_image_location(location: &str) -> Result<(), ValidationError> {
    let file_name = location.rsplit('/').next().unwrap_or_default();
    let supported = file_name.rsplit_once('.').is_some_and(|(_, ext)| {
        SUPPORTED_IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    });

    if supported {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_format").with_message("Unsupported format".into()))
    }
}
