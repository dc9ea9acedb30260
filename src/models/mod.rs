use uuid::Uuid;

pub mod product;

pub use product::*;

/// Product ids are simple-format UUIDs stored as TEXT.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
