pub mod files;
pub mod login;
pub mod logout;
