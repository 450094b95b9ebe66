pub mod file_dto;
pub mod repository_dto;
pub mod response_dto;

pub use file_dto::*;
pub use repository_dto::*;
pub use response_dto::*;
