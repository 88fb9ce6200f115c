mod compiler;
mod remote;
mod session;
mod toolchain;

pub use compiler::ScriptCompiler;
pub use remote::{ProbeScripts, RemoteRunner};
pub use session::{RemoteSession, SessionFactory};
pub use toolchain::ScriptToolchainBuilder;
