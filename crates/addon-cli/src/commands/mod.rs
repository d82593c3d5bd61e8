//! Command implementations for addon-cli

pub mod inspect;
pub mod list;
pub mod pass;

pub use inspect::run_inspect;
pub use list::run_list;
pub use pass::run_pass;
