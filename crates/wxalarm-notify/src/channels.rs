pub mod console;

pub use console::ConsoleTransport;
