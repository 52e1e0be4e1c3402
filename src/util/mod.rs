mod ids;

pub use ids::{random_document_id, random_uid, token_derived_uid};
