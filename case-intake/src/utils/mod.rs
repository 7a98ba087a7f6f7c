pub mod logging;
pub mod path_resolver;
