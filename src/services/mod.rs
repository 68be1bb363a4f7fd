//! Service layer separating byte-level I/O from compositing logic

pub mod io;

pub use io::ImageIOService;
