pub mod files;
pub mod scorer;
