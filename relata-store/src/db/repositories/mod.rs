mod person_repository;
mod thing_repository;
mod user_repository;
mod post_repository;
mod like_repository;

pub use person_repository::PersonRepository;
pub use thing_repository::ThingRepository;
pub use user_repository::UserRepository;
pub use post_repository::PostRepository;
pub use like_repository::LikeRepository;
