pub mod check;
pub mod config;
pub mod parser;
pub mod remote;
pub mod template;
pub mod version;
