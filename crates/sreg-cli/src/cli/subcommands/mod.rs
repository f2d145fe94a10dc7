mod compat;

pub use compat::CompatCommands;
