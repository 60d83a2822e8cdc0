pub mod directory;
pub mod logger;
pub mod progress;
