// Output generation module

pub mod functions;
pub mod html;
pub mod templates;

pub use functions::*;
pub use html::*;
pub use templates::*;
