mod script;

pub use script::*;
