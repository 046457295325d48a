pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod photometry;
pub mod session;
pub mod source;
pub mod stats;
pub mod track;
pub mod worker;
