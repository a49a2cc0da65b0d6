pub mod database;
mod data_manager;

pub use data_manager::*;

#[derive(Debug)]
pub enum DataManagerError {
    Database(String),
}
