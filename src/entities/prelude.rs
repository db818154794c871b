pub use super::face_embeddings::Entity as FaceEmbeddings;
pub use super::face_pins::Entity as FacePins;
pub use super::users::Entity as Users;
