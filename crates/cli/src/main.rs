//! Hooksmith CLI entry point
//!
//! Parses arguments and delegates to the library.

use clap::Parser;

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = hooksmith::Cli::parse();

    if let Err(e) = hooksmith::run(cli) {
        let report = miette::Report::msg(format!("{e:#}"));
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}
