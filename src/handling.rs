//! Traits to unwrap without panic but a deliberate process exit.
//! Calls std::process::exit, so destructors of live values do not run:
//! only use them in `main` where the store has been closed or is about to be dropped anyway.
use log::{error, log_enabled, Level};
use std::fmt::Display;
use std::process;

/// Exit code for every fatal error
pub const EXIT_FAILURE: i32 = 1;

/// Report through the logger once it is up, plain stderr before that
fn report(msg: &str) {
    if log_enabled!(Level::Error) {
        error!("{}", msg);
    } else {
        eprintln!("{}", msg);
    }
}

/// Lets the program exit with exit code one based on Result<T,E> with desired messages
pub trait GracefulResult<T> {
    fn unwrap_graceful(self) -> T;
    fn unwrap_formatful(self, fmt: &str) -> T;
}

impl<T, E: Display> GracefulResult<T> for Result<T, E> {
    /// If Err(e) report e and exit with 1.
    fn unwrap_graceful(self) -> T {
        match self {
            Err(e) => {
                report(&e.to_string());
                process::exit(EXIT_FAILURE);
            }
            Ok(x) => x,
        }
    }
    /// If Err(e) report "{fmt}: {e}" and exit with 1.
    fn unwrap_formatful(self, fmt: &str) -> T {
        match self {
            Err(e) => {
                report(&format!("{}: {}", fmt, e));
                process::exit(EXIT_FAILURE);
            }
            Ok(x) => x,
        }
    }
}

/// Shortcut to fail with exit code 1 and a custom message for empty options
pub trait GracefulOption<T> {
    fn unwrap_graceful(self, msg: &str) -> T;
}

impl<T> GracefulOption<T> for Option<T> {
    /// If None report msg and exit with 1.
    fn unwrap_graceful(self, msg: &str) -> T {
        match self {
            None => {
                report(msg);
                process::exit(EXIT_FAILURE);
            }
            Some(x) => x,
        }
    }
}
