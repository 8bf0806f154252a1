#![forbid(unsafe_code)]

pub mod json;
pub mod repository;

pub use json::JsonCourseDirectory;
pub use repository::{
    CourseRepository, InMemoryRepository, ProgressRepository, Storage, StorageError,
};
