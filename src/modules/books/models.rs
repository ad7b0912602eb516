use bookshelf_http::validation::{FieldError, Rule, Validatable, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Longest title or author the `books` table accepts
pub const MAX_FIELD_LENGTH: usize = 255;

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    /// Assigned once at creation, never changed
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Wire representation sent to clients
    pub fn to_dto(&self) -> BookDto {
        BookDto {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Book as accepted from clients on create and update.
///
/// Missing keys and `null` values decode as empty strings so they are
/// reported by validation rather than rejected as malformed JSON. Any `id`
/// in the body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookForm {
    #[serde(deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub author: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl BookForm {
    /// Build the persisted model for `id`, stamping both timestamps with now.
    pub fn to_model(self, id: Uuid) -> Book {
        let now = OffsetDateTime::now_utc();
        Book {
            id,
            title: self.title,
            author: self.author,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Validatable for BookForm {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validation::new()
            .field(
                "title",
                &self.title,
                &[Rule::Required, Rule::MaxLength(MAX_FIELD_LENGTH)],
            )
            .field(
                "author",
                &self.author,
                &[Rule::Required, Rule::MaxLength(MAX_FIELD_LENGTH)],
            )
            .finish()
    }
}

/// Book as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDto {
    pub id: Uuid,
    pub title: String,
    pub author: String,
}
