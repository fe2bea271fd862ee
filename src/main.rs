use clap::Parser;

use binpress::cli::Cli;

#[cfg(unix)]
extern "C" fn handle_fatal_signal(sig: i32) {
    log::error!("fatal signal {sig}, exiting");
    std::process::exit(128 + sig);
}

#[cfg(unix)]
fn install_signal_handlers() {
    // SAFETY: each signum is a valid constant and the handler is a plain
    // `extern "C" fn(i32)`, the shape `libc::signal` expects.
    unsafe {
        libc::signal(libc::SIGSEGV, handle_fatal_signal as libc::sighandler_t);
        libc::signal(libc::SIGABRT, handle_fatal_signal as libc::sighandler_t);
        libc::signal(libc::SIGILL, handle_fatal_signal as libc::sighandler_t);
        libc::signal(libc::SIGFPE, handle_fatal_signal as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.verbosity.log_level_filter()).init();

    install_signal_handlers();

    if let Err(e) = cli.run() {
        log::error!("{e}");
        std::process::exit(e.exit_code());
    }
}
