pub mod prelude;

pub mod face_embeddings;
pub mod face_pins;
pub mod users;
