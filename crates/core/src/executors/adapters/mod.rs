//! Built-in executor implementations.

pub mod mock_executor;
pub mod shell_executor;

pub use mock_executor::MockExecutor;
pub use shell_executor::ShellExecutor;
