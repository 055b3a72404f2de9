pub mod config;
pub mod doctor;
pub mod install;
pub mod status;
pub mod uninstall;
