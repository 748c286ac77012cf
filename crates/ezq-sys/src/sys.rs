// sys.rs -- process exit paths

use std::process;

/// Fatal error: report and exit. The display must already be restored.
pub fn sys_error(error: &str) -> ! {
    eprintln!("Error: {}", error);
    tracing::error!("{}", error);
    process::exit(1);
}

/// Clean shutdown.
pub fn sys_quit() -> ! {
    process::exit(0);
}
