pub mod cartridge;
pub mod memory;
pub mod state;
