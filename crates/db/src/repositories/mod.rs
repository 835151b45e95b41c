//! SQL repositories, one unit struct per table family.

pub mod category_repo;
pub mod quiz_repo;
pub mod tag_repo;

pub use category_repo::CategoryRepo;
pub use quiz_repo::QuizRepo;
pub use tag_repo::TagRepo;
