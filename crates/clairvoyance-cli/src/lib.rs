/*
[INPUT]:  Public API exports for clairvoyance-cli crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point behind the binary
[UPDATE]: When adding new modules or public exports
*/

pub mod commands;
pub mod config;
pub mod prompt;
pub mod wallets;

// Re-export main types for convenience
pub use commands::App;
pub use config::CliConfig;
