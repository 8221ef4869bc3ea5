pub mod aggregate;
pub mod config;
pub mod normalize;
pub mod plot;
pub mod record;
pub mod scan;
pub mod util;
