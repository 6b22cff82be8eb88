use sqlx::FromRow;

/// Provisioned account. `role` is stored as text and parsed into
/// [`crate::model::role::Role`] where it matters.
#[derive(Debug, FromRow)]
pub struct Officer {
    pub id: i64,
    pub nip: String,
    pub name: String,
    pub password: String,
    pub role: String,
}
