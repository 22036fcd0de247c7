//! Entry point for the `eventgated` binary.

use std::fmt::Display;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    exit_code(eventgated::run_gateway(), &mut io::stderr().lock())
}

/// Maps the gateway outcome to an exit status, reporting any failure on
/// `stderr`. The status does not depend on whether the report was written.
fn exit_code<E: Display>(outcome: Result<(), E>, stderr: &mut impl Write) -> ExitCode {
    let Err(error) = outcome else {
        return ExitCode::SUCCESS;
    };
    match writeln!(stderr, "eventgated: {error}") {
        Ok(()) | Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedStream;

    impl Write for ClosedStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn success_writes_nothing() {
        let mut stderr = Vec::new();
        assert_eq!(exit_code(Ok::<(), &str>(()), &mut stderr), ExitCode::SUCCESS);
        assert!(stderr.is_empty());
    }

    #[test]
    fn failure_is_reported_with_binary_prefix() {
        let mut stderr = Vec::new();
        assert_eq!(
            exit_code(Err("bind refused"), &mut stderr),
            ExitCode::FAILURE
        );
        assert_eq!(
            String::from_utf8(stderr).expect("utf-8 report"),
            "eventgated: bind refused\n"
        );
    }

    #[test]
    fn unwritable_stderr_still_fails_the_process() {
        assert_eq!(
            exit_code(Err("bind refused"), &mut ClosedStream),
            ExitCode::FAILURE
        );
    }
}
