mod extract;
mod register;
pub mod server;
mod setup;
mod stats;

pub use extract::*;
pub use register::*;
pub use server::*;
pub use setup::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
