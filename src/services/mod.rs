pub mod auth_service;
pub mod auth_service_impl;
pub mod face_service;
pub mod face_service_impl;

pub use auth_service::{AuthError, AuthService, RegisterRequest, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;
pub use face_service::{FaceError, FaceService, PinStatus, VerifyOutcome};
pub use face_service_impl::SeaOrmFaceService;
