use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Settings for a single CLI spinner: its message, failure text and
/// optional step-of-n prefix (`[2/3]`).
#[derive(Clone)]
pub struct SpinnerOptions {
    pub style: ProgressStyle,
    pub message: String,
    pub failure_message: String,
}

impl SpinnerOptions {
    pub fn new(message: String) -> SpinnerOptions {
        SpinnerOptions {
            style: ProgressStyle::default_spinner()
                .template("{spinner} {wide_msg}"),
            message,
            failure_message: console::style("(failed)").red().bold().to_string(),
        }
    }
}

/// Renders a wait spinner while a blocking HTTP call runs, then replaces it
/// with a final status line. The closure must have no other side effects
/// on stdout.
pub struct WaitUntil<'a> {
    options: &'a SpinnerOptions,
    pb: ProgressBar,
}

pub struct WaitResult<T> {
    result: T,
    status: String,
}

impl<T> WaitResult<T> {
    pub fn from(result: T, status: String) -> WaitResult<T> {
        WaitResult { result, status }
    }
}

impl<'a> WaitUntil<'a> {
    pub fn new(options: &'a SpinnerOptions) -> WaitUntil<'a> {
        WaitUntil {
            options,
            pb: ProgressBar::new(u64::MAX),
        }
    }

    pub fn spin_until_status<F, T>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<WaitResult<T>>,
    {
        self.pb.set_style(self.options.style.clone());
        self.pb.set_message(self.options.message.clone());
        self.pb.enable_steady_tick(100);

        match f() {
            Ok(w) => {
                self.pb
                    .finish_with_message(format!("{} {}", self.options.message, w.status));
                Ok(w.result)
            }
            Err(e) => {
                self.pb.finish_with_message(format!(
                    "{} {}",
                    self.options.message, self.options.failure_message
                ));
                Err(e)
            }
        }
    }
}
