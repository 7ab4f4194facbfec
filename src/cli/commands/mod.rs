pub mod config;
pub mod hexdump;
pub mod python;
pub mod scan;
pub mod vba;
