pub mod io;
pub mod shell;
