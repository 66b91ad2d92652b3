//! Logging in tests is important for troubleshooting, but works very differently then in
//! production.
//!
//! Each test gets its own `tracing` dispatcher and its own tokio runtime, so the log events of
//! one test are never interleaved with those of another, even when the events come from tokio
//! worker threads or the blocking pool.
use crate::Result;
use std::{
    cell::RefCell,
    future::Future,
    io::Write,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing_subscriber::fmt::MakeWriter;

/// Log filter used when `RUST_LOG` isn't set
const DEFAULT_FILTER: &str = "h2=warn,hyper=info,rustls=info,aws=info,debug";

/// An implementation of `MakeWriter` that captures all log events for a single test
#[derive(Clone)]
struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Clear the buffer, returning the current contents as a string
    fn take_string(&self) -> String {
        let mut guard = self.buffer.lock().unwrap();

        String::from_utf8_lossy(&std::mem::take(&mut *guard)).into_owned()
    }
}

impl<'a> Write for &'a LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = &'a Self;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

/// Run a test future with logging enabled, on a dedicated multi-threaded tokio runtime.
///
/// This takes the place of `tokio::test`.  The log events of the test are printed once it
/// completes (or panics), so they show up next to the test's failure output.
pub fn test_with_logging(test: impl Future<Output = Result<()>>) -> Result<()> {
    let (result, logs) = run_capturing_logs(test);

    println!("Log events from this test: \n{}", logs);

    result
}

/// Same as [`test_with_logging`], but instead of printing the captured log events, hand them to
/// `check` so the test can make assertions about what was logged.
///
/// `check` only runs if the test itself succeeded.
pub fn test_with_log_assertions(
    test: impl Future<Output = Result<()>>,
    check: impl FnOnce(&str),
) -> Result<()> {
    let (result, logs) = run_capturing_logs(test);

    println!("Log events from this test: \n{}", logs);

    result?;
    check(&logs);

    Ok(())
}

fn run_capturing_logs(test: impl Future<Output = Result<()>>) -> (Result<()>, String) {
    let capture = LogCapture::new();

    let dispatch = {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{fmt, EnvFilter};

        let format = fmt::layer()
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(false)
            .with_ansi(false)
            .with_writer(capture.clone());

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
            .unwrap();

        tracing::Dispatch::new(tracing_subscriber::registry().with(filter).with(format))
    };

    let dispatch = Arc::new(dispatch);

    let result = tracing::dispatcher::with_default(&dispatch, || {
        std::thread_local! {
            static THREAD_DISPATCHER_GUARD: RefCell<Option<tracing::subscriber::DefaultGuard>> = RefCell::new(None);
        }

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all();
        {
            let dispatch = dispatch.clone();
            builder.on_thread_start(move || {
                let dispatch = dispatch.clone();

                THREAD_DISPATCHER_GUARD.with(|cell| {
                    cell.replace(Some(tracing::dispatcher::set_default(&dispatch)));
                })
            });
        }

        builder.on_thread_stop(|| {
            THREAD_DISPATCHER_GUARD.with(|cell| cell.replace(None));
        });

        let runtime = builder.build()?;

        // Test futures aren't required to be unwind safe; the runtime is dropped either way
        let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
            let result = runtime.block_on(test);
            runtime.shutdown_timeout(Duration::from_secs(10));

            result
        }));

        match result {
            Ok(result) => result,
            Err(panic) => {
                println!("Log events from this test: \n{}", capture.take_string());
                std::panic::resume_unwind(panic)
            }
        }
    });

    (result, capture.take_string())
}
