use std::io::{self, Write};
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. The default level is `info`; `debug` is enabled via the
/// config file, and only then does `RUST_LOG` override the level.
///
/// Events go to the debugger output on Windows (stderr elsewhere) and, when
/// `log_file` is set, to that file as well. Calling this more than once is
/// harmless; only the first call installs a subscriber.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // Inside another process an inherited RUST_LOG must not turn on verbose
    // output unless asked for.
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let file_layer = log_file.filter(|_| FILE_GUARD.get().is_none()).and_then(|path| {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let name = path.file_name()?.to_owned();
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        FILE_GUARD.set(guard).ok()?;
        Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(DebugOutput))
        .with(file_layer)
        .try_init();
}

/// Console sink. A DLL inside `magnify.exe` has no console, so on Windows
/// lines go to `OutputDebugStringW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugOutput;

impl<'a> MakeWriter<'a> for DebugOutput {
    type Writer = DebugOutputWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DebugOutputWriter
    }
}

pub struct DebugOutputWriter;

impl Write for DebugOutputWriter {
    #[cfg(windows)]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use windows::core::HSTRING;
        use windows::Win32::System::Diagnostics::Debug::OutputDebugStringW;

        let line = HSTRING::from(String::from_utf8_lossy(buf).as_ref());
        unsafe { OutputDebugStringW(&line) };
        Ok(buf.len())
    }

    #[cfg(not(windows))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
