pub mod providers;
pub mod signals;
pub mod tracksnip_env;
pub mod wav;
