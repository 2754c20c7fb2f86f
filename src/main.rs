use clap::Parser;

mod commands;
mod output;
mod tty;

use commands::rewrite;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "db-assert")]
#[command(version = VERSION)]
#[command(about = "Add non-null assertions to doc(db, ...) and collection(db, ...) calls")]
struct Cli {
    #[command(flatten)]
    rewrite: rewrite::RewriteArgs,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    tty::status("db-assert is working...");

    let (json_result, exit_code) = output::map_cmd_result_to_json(rewrite::run(&cli.rewrite));

    // Success stays silent on stdout unless a report was requested.
    let printed = match json_result {
        Ok(value) if cli.rewrite.report => output::print_result(Ok(value)),
        Ok(_) => Ok(()),
        Err(err) => output::print_result::<serde_json::Value>(Err(err)),
    };

    if let Err(err) = printed {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
