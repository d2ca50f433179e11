pub mod builders;
pub mod mock_database;

pub use builders::*;
pub use mock_database::*;
