extern crate gcdt;

use std::path::Path;

fn main() -> Result<(), gcdt::error::Error> {
    let matches = gcdt::cli::parse_flags();

    gcdt::utils::initialize_logging_from_args(&matches);

    let path = matches
        .value_of("path")
        .ok_or_else(|| gcdt::error::Error::CliInputError("Path is required.".to_string()))?;
    let path = Path::new(path);

    match matches.subcommand() {
        ("info", Some(_)) => gcdt::info::show(path)?,
        ("ls", Some(cmd)) => gcdt::ls::show(path, cmd.value_of("folder"))?,
        ("check", Some(_)) => gcdt::check::run(path)?,
        ("extract", Some(cmd)) => {
            let destination = cmd.value_of("destination").ok_or_else(|| {
                gcdt::error::Error::CliInputError("Destination is required.".to_string())
            })?;
            gcdt::extract::run(path, Path::new(destination))?
        }
        ("build", Some(cmd)) => {
            let destination = cmd.value_of("destination").ok_or_else(|| {
                gcdt::error::Error::CliInputError("Destination is required.".to_string())
            })?;
            gcdt::build::run(
                path,
                Path::new(destination),
                cmd.value_of("alignment").map(Path::new),
                cmd.value_of("disc-size"),
            )?
        }
        _ => {
            println!("No command specified or unknown command. Use --help for available commands.");
        }
    }
    Ok(())
}
