pub mod maps;
pub mod rides;
