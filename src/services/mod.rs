pub mod directory;

pub use directory::{
    Business, BusinessDirectory, DirectoryError, MemoryDirectory, PgBusinessDirectory,
    PgUserDirectory, UserDirectory, UserProfile,
};
