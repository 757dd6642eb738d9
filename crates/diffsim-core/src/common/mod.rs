pub mod constants;
pub mod elements;
pub mod materials;

pub use elements::{ElementData, ElementTableError, ElementTables};
pub use materials::{Material, MaterialType};
